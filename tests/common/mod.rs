use assert_cmd::{Command, cargo::cargo_bin_cmd};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// Each integration test file is compiled as its own crate, and not every
// crate uses every helper.
#[allow(dead_code)]
pub fn depstamp_cmd(cwd: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("depstamp");
    cmd.env_remove("RUST_LOG").arg("-C").arg(cwd);
    cmd
}

/// A build action with inputs `a.dart` and `b.dart`, listed by the depfile
/// `app.d`, stamped at `app.stamp`. All paths are relative to the temp dir.
#[allow(dead_code)]
pub struct Action {
    pub temp: TempDir,
}

#[allow(dead_code)]
impl Action {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.dart"), "void a() {}").unwrap();
        fs::write(temp.path().join("b.dart"), "void b() {}").unwrap();
        fs::write(temp.path().join("app.d"), "app.dill : a.dart b.dart\n").unwrap();
        Action { temp }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.temp.path().join(name)
    }

    /// Runs `command` (check or stamp) for this action under release/android.
    pub fn run(&self, command: &str) -> Command {
        let mut cmd = depstamp_cmd(self.temp.path());
        cmd.arg(command)
            .args(["--stamp", "app.stamp"])
            .args(["--mode", "release"])
            .args(["--platform", "android"])
            .args(["--depfile", "app.d"]);
        cmd
    }
}
