#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

/// Whether a usable `git` binary is on the PATH; git-backed tests skip themselves otherwise.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

/// Run `git <args>` inside `dir`, panicking with stderr on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(dir)
        .args(["-c", "user.name=Booth Tester", "-c", "user.email=booth@example.com"])
        .args(["-c", "commit.gpgsign=false", "-c", "init.defaultBranch=main"])
        .args(args)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A local repository standing in for the remote game repository.
pub struct Upstream {
    pub dir: PathBuf,
}

impl Upstream {
    /// Create `<parent>/<name>` on branch `main` with `files` committed.
    pub fn create(parent: &Path, name: &str, files: &[(&str, &str)]) -> Self {
        let dir = parent.join(name);
        fs::create_dir_all(&dir).unwrap();
        git(&dir, &["init", "-q"]);
        git(&dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);

        let upstream = Self { dir };
        upstream.commit(files, "initial commit");
        upstream
    }

    /// Write `files` and commit them; returns the new commit id.
    pub fn commit(&self, files: &[(&str, &str)], message: &str) -> String {
        for (relative, contents) in files {
            let path = self.dir.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, contents).unwrap();
        }
        git(&self.dir, &["add", "-A"]);
        git(&self.dir, &["commit", "-q", "-m", message]);
        self.head()
    }

    pub fn head(&self) -> String {
        git(&self.dir, &["rev-parse", "HEAD"])
    }

    /// `file://` URL so shallow clones behave like they do against a real remote.
    pub fn url(&self) -> String {
        format!("file://{}", self.dir.display())
    }
}
