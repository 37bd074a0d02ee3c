use super::{json_pretty, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use charm_release_core::{CoreError, ReleaseReport, ReleaseRequest, Releaser, RevisionOrigin};
use charm_release_runtime::{check_release_prereqs, format_missing, SystemRunner, ToolConfig};
use console::style;

/// Release the charm described by `request`.
///
/// With `check_prereqs`, the metadata is validated before the tool lookup, so
/// a broken manifest is reported without spawning anything.
pub fn run(
    request: &ReleaseRequest,
    config: ToolConfig,
    check_prereqs: bool,
    json: bool,
) -> Result<u8, String> {
    let runner = SystemRunner::new();
    let releaser = Releaser::new(&runner, config);

    if check_prereqs {
        if let Err(e) = releaser.load(request) {
            return report_failure(&e, json);
        }
        let missing = check_release_prereqs(releaser.config());
        if !missing.is_empty() {
            return Err(format_missing(&missing));
        }
    }

    let pb = (!json).then(|| spinner("releasing charm"));
    let progress = |msg: &str| {
        if let Some(pb) = &pb {
            pb.set_message(msg.to_owned());
        }
    };

    match releaser.release(request, &progress) {
        Ok(report) => {
            if let Some(pb) = &pb {
                spin_ok(pb, &format!("released to {}", report.channel));
            }
            if json {
                println!("{}", json_pretty(&report)?);
            } else {
                print_report(&report);
            }
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            if let Some(pb) = &pb {
                spin_fail(pb, "release failed");
            }
            report_failure(&e, json)
        }
    }
}

fn report_failure(e: &CoreError, json: bool) -> Result<u8, String> {
    let code = e.exit_code();
    eprintln!("error: {e}");
    if json {
        let out = serde_json::json!({
            "error": e.to_string(),
            "exit_code": code,
        });
        println!("{}", json_pretty(&out)?);
    }
    Ok(code)
}

fn print_report(report: &ReleaseReport) {
    for resource in &report.resources {
        println!(
            "Revision of resource {}: {}",
            resource.resource, resource.revision
        );
    }
    let origin = match report.origin {
        RevisionOrigin::Created => "new upload",
        RevisionOrigin::Existing => "already in the store",
    };
    println!(
        "{} revision {} ({origin}) released to {}",
        style(&report.charm).bold(),
        report.revision,
        style(&report.channel).cyan()
    );
}
