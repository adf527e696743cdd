//! Where server jars come from and how they are built and launched.

pub const BUILD_TOOLS_URL: &str = concat!(
    "https://hub.spigotmc.org/jenkins/job/BuildTools",
    "/lastSuccessfulBuild/artifact/target/BuildTools.jar",
);
pub const PAPER_URL_TEMPLATE: &str = concat!(
    "https://api.papermc.io/v2/projects/paper/versions/{minecraft_version}",
    "/builds/{paper_build}/downloads/paper-{minecraft_version}-{paper_build}.jar",
);

const EULA_PROPERTY: &str = "-Dcom.mojang.eula.agree=true";
const SERVER_FLAGS: &[&str] = &["--nogui", "--nojline"];

/// Fills the `{minecraft_version}` and `{paper_build}` placeholders.
pub fn paper_download_url(template: &str, minecraft_version: &str, paper_build: &str) -> String {
    template
        .replace("{minecraft_version}", minecraft_version)
        .replace("{paper_build}", paper_build)
}

/// BuildTools leaves the compiled server next to itself under this name.
pub fn spigot_jar_name(minecraft_version: &str) -> String {
    format!("spigot-{minecraft_version}.jar")
}

pub fn build_tools_command(
    java: &str,
    build_tools_jar: &str,
    minecraft_version: &str,
) -> Vec<String> {
    vec![
        java.to_string(),
        "-jar".to_string(),
        build_tools_jar.to_string(),
        "--rev".to_string(),
        minecraft_version.to_string(),
    ]
}

/// `java -Dcom.mojang.eula.agree=true [jvm_args] -jar <jar> --nogui --nojline`
pub fn launch_command(java: &str, jvm_args: &[String], server_jar: &str) -> Vec<String> {
    let mut argv = vec![java.to_string(), EULA_PROPERTY.to_string()];
    argv.extend(jvm_args.iter().cloned());
    argv.push("-jar".to_string());
    argv.push(server_jar.to_string());
    argv.extend(SERVER_FLAGS.iter().map(|flag| flag.to_string()));
    argv
}
