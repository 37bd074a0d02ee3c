use super::EXIT_SUCCESS;
use clap::CommandFactory;
use std::path::Path;

fn render(cmd: clap::Command, dir: &Path, file_stem: &str) -> Result<(), String> {
    let mut buf = Vec::new();
    clap_mangen::Man::new(cmd)
        .render(&mut buf)
        .map_err(|e| format!("man page render failed: {e}"))?;
    let path = dir.join(format!("{file_stem}.1"));
    std::fs::write(&path, &buf).map_err(|e| format!("failed to write {}: {e}", path.display()))
}

/// Write one page for the binary and one per subcommand into `dir`.
pub fn run<C: CommandFactory>(dir: &Path) -> Result<u8, String> {
    std::fs::create_dir_all(dir).map_err(|e| format!("failed to create dir: {e}"))?;
    let cmd = C::command();
    let bin = cmd.get_name().to_owned();
    for sub in cmd.get_subcommands() {
        render(sub.clone(), dir, &format!("{bin}-{}", sub.get_name()))?;
    }
    render(cmd, dir, &bin)?;
    println!("man pages written to {}", dir.display());
    Ok(EXIT_SUCCESS)
}
