use super::{json_pretty, load_config, EXIT_FAILURE, EXIT_SUCCESS};
use charm_release_runtime::check_release_prereqs;
use charm_release_schema::load_manifest;
use std::path::Path;

pub fn run(config_path: Option<&Path>, metadata: Option<&Path>, json: bool) -> Result<u8, String> {
    let mut checks = Vec::new();

    match load_config(config_path) {
        Ok(config) => {
            let source = config_path.map_or_else(
                || "default configuration".to_owned(),
                |p| p.display().to_string(),
            );
            checks.push(Check::pass("config", &format!("Configuration: {source}")));
            checks.push(Check::info(
                "channel",
                &format!("Release channel: {}", config.channel),
            ));

            let missing = check_release_prereqs(&config);
            for tool in [&config.charmcraft, &config.docker] {
                match missing.iter().find(|m| &m.name == tool) {
                    Some(m) => checks.push(Check::fail(
                        "tool",
                        &format!(
                            "{tool} not found, needed for {} (install: {})",
                            m.purpose, m.install_hint
                        ),
                    )),
                    None => checks.push(Check::pass("tool", &format!("{tool} found"))),
                }
            }
        }
        Err(e) => checks.push(Check::fail("config", &format!("Configuration invalid: {e}"))),
    }

    if let Some(path) = metadata {
        match load_manifest(path) {
            Ok(manifest) => {
                let images = manifest.oci_images().count();
                checks.push(Check::pass(
                    "metadata",
                    &format!(
                        "Metadata: charm '{}' with {images} OCI image resource(s)",
                        manifest.name
                    ),
                ));
            }
            Err(e) => checks.push(Check::fail(
                "metadata",
                &format!("Metadata {} invalid: {e}", path.display()),
            )),
        }
    }

    let all_pass = checks.iter().all(|c| c.status != "fail");

    if json {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!("{}", json_pretty(&json)?);
    } else {
        println!("charm-release doctor\n");
        for check in &checks {
            let icon = match check.status {
                "pass" => "✓",
                "fail" => "✗",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: &'static str,
    status: &'static str,
    message: String,
}

impl Check {
    fn new(name: &'static str, status: &'static str, message: &str) -> Self {
        Self {
            name,
            status,
            message: message.to_owned(),
        }
    }

    fn pass(name: &'static str, message: &str) -> Self {
        Self::new(name, "pass", message)
    }

    fn fail(name: &'static str, message: &str) -> Self {
        Self::new(name, "fail", message)
    }

    fn info(name: &'static str, message: &str) -> Self {
        Self::new(name, "info", message)
    }
}
