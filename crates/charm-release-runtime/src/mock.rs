use crate::runner::{Invocation, ToolOutput, ToolRunner};
use crate::RuntimeError;
use std::sync::Mutex;

struct Response {
    program: String,
    args: Vec<String>,
    output: ToolOutput,
}

/// Runner that replays scripted tool transcripts instead of spawning processes.
///
/// Responses are matched on the exact program and argument list. Every
/// invocation is recorded, matched or not, so tests can assert which tools
/// ran and which never did.
#[derive(Default)]
pub struct MockRunner {
    responses: Mutex<Vec<Response>>,
    calls: Mutex<Vec<Invocation>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the output returned for `program args...`.
    #[must_use]
    pub fn respond(mut self, program: &str, args: &[&str], output: ToolOutput) -> Self {
        if let Ok(responses) = self.responses.get_mut() {
            responses.push(Response {
                program: program.to_owned(),
                args: args.iter().map(|a| (*a).to_owned()).collect(),
                output,
            });
        }
        self
    }

    /// All invocations seen so far, in order.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Invocations whose first argument is `subcommand`.
    pub fn calls_to(&self, program: &str, subcommand: &str) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|c| {
                c.program == program && c.args.first().map(String::as_str) == Some(subcommand)
            })
            .collect()
    }
}

impl ToolRunner for MockRunner {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, RuntimeError> {
        self.calls
            .lock()
            .map_err(|e| RuntimeError::Config(format!("mutex poisoned: {e}")))?
            .push(invocation.clone());

        let responses = self
            .responses
            .lock()
            .map_err(|e| RuntimeError::Config(format!("mutex poisoned: {e}")))?;
        responses
            .iter()
            .find(|r| r.program == invocation.program && r.args == invocation.args)
            .map(|r| r.output.clone())
            .ok_or_else(|| RuntimeError::ExecFailed {
                command: invocation.to_string(),
                reason: "no scripted response".to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_scripted_output() {
        let runner = MockRunner::new().respond(
            "docker",
            &["pull", "registry/app:1.0"],
            ToolOutput::ok("pulled\n"),
        );
        let out = runner
            .run(&Invocation::new("docker").args(["pull", "registry/app:1.0"]))
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "pulled\n");
    }

    #[test]
    fn unscripted_invocation_fails_but_is_recorded() {
        let runner = MockRunner::new();
        let inv = Invocation::new("charmcraft").arg("pack").cwd("/tmp/charm");
        assert!(runner.run(&inv).is_err());
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], inv);
    }

    #[test]
    fn calls_to_filters_by_subcommand() {
        let runner = MockRunner::new()
            .respond("docker", &["pull", "a:1"], ToolOutput::ok(""))
            .respond("charmcraft", &["pack"], ToolOutput::ok(""));
        runner
            .run(&Invocation::new("docker").args(["pull", "a:1"]))
            .unwrap();
        runner.run(&Invocation::new("charmcraft").arg("pack")).unwrap();
        assert_eq!(runner.calls_to("docker", "pull").len(), 1);
        assert_eq!(runner.calls_to("charmcraft", "pack").len(), 1);
        assert!(runner.calls_to("charmcraft", "upload").is_empty());
    }
}
