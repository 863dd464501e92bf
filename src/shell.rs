//! Shell script generation
//!
//! `try` cannot change its parent shell's directory, so every action is
//! printed as a command sequence that the `try` shell function evaluates.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::ui::TokenMode;

/// First line of every script, visible only when `try` is run without the
/// shell function
pub const SCRIPT_WARNING: &str = "# if you can read this, you didn't launch try from an alias. run try --help.";

/// POSIX single-quote a string
pub fn q(s: &str) -> String {
    format!("'{}'", s.replace('\'', r#"'"'"'"#))
}

fn qp(path: &Path) -> String {
    q(&path.to_string_lossy())
}

/// Write the commands joined with `&& \` continuations
pub fn emit_script<W: Write>(out: &mut W, cmds: &[String]) -> io::Result<()> {
    writeln!(out, "{}", SCRIPT_WARNING)?;
    for (i, cmd) in cmds.iter().enumerate() {
        if i > 0 {
            write!(out, "  ")?;
        }
        write!(out, "{}", cmd)?;
        if i + 1 < cmds.len() {
            writeln!(out, " && \\")?;
        } else {
            writeln!(out)?;
        }
    }
    out.flush()
}

pub fn script_cd(path: &Path) -> Vec<String> {
    vec![format!("touch {}", qp(path)), format!("cd {}", qp(path))]
}

pub fn script_mkdir_cd(path: &Path) -> Vec<String> {
    let mut cmds = vec![format!("mkdir -p {}", qp(path))];
    cmds.extend(script_cd(path));
    cmds
}

pub fn script_clone(path: &Path, uri: &str, tokens: TokenMode) -> Vec<String> {
    let msg = tokens.apply(&format!("Using {{b}}git clone{{/b}} to create this trial from {}.", uri));
    let mut cmds = vec![
        format!("mkdir -p {}", qp(path)),
        format!("echo {}", q(&msg)),
        format!("git clone {} {}", q(uri), qp(path)),
    ];
    cmds.extend(script_cd(path));
    cmds
}

/// Add a detached worktree at `path`. Without `repo` the current directory's
/// repository is used. Outside a repository the worktree step does nothing.
pub fn script_worktree(path: &Path, repo: Option<&Path>, cwd: &Path, tokens: TokenMode) -> Vec<String> {
    let git = match repo {
        Some(r) => format!("git -C {}", qp(r)),
        None => "git".to_string(),
    };
    let worktree_cmd = format!(
        "/usr/bin/env sh -c 'if {git} rev-parse --is-inside-work-tree >/dev/null 2>&1; \
         then repo=$({git} rev-parse --show-toplevel); \
         git -C \"$repo\" worktree add --detach {path} >/dev/null 2>&1 || true; fi; exit 0'",
        git = git,
        path = qp(path),
    );

    let src = repo.unwrap_or(cwd);
    let msg = tokens.apply(&format!(
        "Using {{b}}git worktree{{/b}} to create this trial from {}.",
        src.display()
    ));

    let mut cmds = vec![format!("mkdir -p {}", qp(path)), format!("echo {}", q(&msg)), worktree_cmd];
    cmds.extend(script_cd(path));
    cmds
}

/// Remove each path (by name, from inside `base`), then return to `cwd`
pub fn script_delete(paths: &[PathBuf], base: &Path, cwd: &Path) -> Vec<String> {
    let mut cmds = vec![format!("cd {}", qp(base))];
    for path in paths {
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        let name = q(&name);
        cmds.push(format!("[[ -d {name} ]] && rm -rf {name}", name = name));
    }
    cmds.push(format!("( cd {} 2>/dev/null || cd \"$HOME\" )", qp(cwd)));
    cmds
}

/// Whether `$SHELL` names fish
pub fn is_fish(shell: Option<&str>) -> bool {
    shell.map_or(false, |s| s.contains("fish"))
}

/// Shell function that runs `try exec` and evaluates its output
pub fn init_script(exe: &Path, tries: &Path, fish: bool) -> String {
    let exe = qp(exe);
    let path_arg = format!(" --path {}", qp(tries));

    if fish {
        format!(
            "function try\n  \
             set -l out ({exe} exec{path_arg} $argv 2>/dev/tty | string collect)\n  \
             if test $status -eq 0\n    \
             eval $out\n  \
             else\n    \
             echo $out\n  \
             end\n\
             end\n",
            exe = exe,
            path_arg = path_arg
        )
    } else {
        format!(
            "try() {{\n  \
             local out\n  \
             out=$({exe} exec{path_arg} \"$@\" 2>/dev/tty)\n  \
             if [ $? -eq 0 ]; then\n    \
             eval \"$out\"\n  \
             else\n    \
             echo \"$out\"\n  \
             fi\n\
             }}\n",
            exe = exe,
            path_arg = path_arg
        )
    }
}
