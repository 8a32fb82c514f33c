use crate::error::{ErrorKind, Result};
use crate::password::Password;
use exn::ResultExt;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// Prefix of the argument carrying the password.
const PASSWORD_FLAG: &str = "-p:";

/// The external extraction tool.
///
/// Expected to understand Bandizip's console syntax:
/// `x [-p:<password>] -o:<destination> -y -aoa <archive>`.
#[derive(Clone, Debug)]
pub struct Extractor {
    path: PathBuf,
}

impl Extractor {
    /// Uses an explicitly configured tool. Bare names are looked up on `PATH`.
    pub fn at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let resolved = which::which(path).or_raise(|| ErrorKind::ExtractorInvalid(path.to_path_buf()))?;
        Ok(Self { path: resolved })
    }

    /// Searches `PATH`, then the well-known install locations.
    pub fn discover() -> Result<Self> {
        let executables = ["bz", "Bandizip", "bandizip"];
        for exe in executables {
            if let Ok(path) = which::which(exe) {
                tracing::debug!(path = %path.display(), "Discovered extractor on PATH");
                return Ok(Self { path });
            }
        }
        tracing::info!("Extractor not found in PATH; checking install locations");
        for path in install_locations() {
            if path.is_file() {
                tracing::debug!(path = %path.display(), "Discovered extractor in install location");
                return Ok(Self { path });
            }
        }
        exn::bail!(ErrorKind::ExtractorNotFound);
    }

    /// Prefers `explicit` when given, otherwise discovers.
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::at(path),
            None => Self::discover(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Non-interactive extraction of `archive` into `destination`,
    /// overwriting existing files and answering yes to every prompt. The
    /// password flag is left out for the empty password.
    pub fn extract_command(&self, archive: &Path, destination: &Path, password: &Password) -> CommandLine {
        let mut args = vec![OsString::from("x")];
        if !password.is_empty() {
            args.push(OsString::from(format!("{PASSWORD_FLAG}{}", password.expose())));
        }
        let mut dest = OsString::from("-o:");
        dest.push(destination.as_os_str());
        args.extend([dest, OsString::from("-y"), OsString::from("-aoa"), archive.as_os_str().to_owned()]);
        CommandLine { program: self.path.clone(), args }
    }

    /// Opens `archive` in the tool's own UI, leaving the rest to the user.
    pub fn interactive_command(&self, archive: &Path) -> CommandLine {
        CommandLine {
            program: self.path.clone(),
            args: vec![archive.as_os_str().to_owned()],
        }
    }
}

#[cfg(windows)]
fn install_locations() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from(r"C:\Program Files\Bandizip\Bandizip.exe"),
        PathBuf::from(r"C:\Program Files (x86)\Bandizip\Bandizip.exe"),
    ];
    if let Some(local) = std::env::var_os("LOCALAPPDATA") {
        paths.push(PathBuf::from(local).join("Bandizip").join("Bandizip.exe"));
    }
    paths
}

#[cfg(not(windows))]
fn install_locations() -> Vec<PathBuf> {
    Vec::new()
}

/// A fully built extractor invocation.
///
/// `Display` renders a shell-like line for logs with the password masked.
#[derive(Clone, Debug)]
pub struct CommandLine {
    program: PathBuf,
    args: Vec<OsString>,
}

impl CommandLine {
    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub(crate) fn to_command(&self) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(&self.program);
        command.args(&self.args).kill_on_drop(true);
        command
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_arg(f, &self.program.to_string_lossy())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            f.write_str(" ")?;
            if arg.starts_with(PASSWORD_FLAG) {
                write!(f, "{PASSWORD_FLAG}***")?;
            } else {
                write_arg(f, &arg)?;
            }
        }
        Ok(())
    }
}

fn write_arg(f: &mut fmt::Formatter<'_>, arg: &str) -> fmt::Result {
    if arg.is_empty() || arg.contains(char::is_whitespace) {
        write!(f, "\"{arg}\"")
    } else {
        f.write_str(arg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> Extractor {
        Extractor { path: PathBuf::from("/opt/bz") }
    }

    #[test]
    fn test_extract_arguments() {
        let line = extractor().extract_command(Path::new("/in/a.rar"), Path::new("/in/a"), &Password::from("abc"));
        let args: Vec<String> = line.args().iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, ["x", "-p:abc", "-o:/in/a", "-y", "-aoa", "/in/a.rar"]);
        assert_eq!(line.program(), Path::new("/opt/bz"));
    }

    #[test]
    fn test_empty_password_omits_flag() {
        let line = extractor().extract_command(Path::new("a.zip"), Path::new("a"), &Password::none());
        let args: Vec<String> = line.args().iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, ["x", "-o:a", "-y", "-aoa", "a.zip"]);
    }

    #[test]
    fn test_display_masks_password() {
        let line = extractor().extract_command(Path::new("/in/my file.rar"), Path::new("/in/my file"), &Password::from("secret"));
        let shown = line.to_string();
        assert!(!shown.contains("secret"));
        assert_eq!(shown, "/opt/bz x -p:*** \"-o:/in/my file\" -y -aoa \"/in/my file.rar\"");
    }

    #[test]
    fn test_interactive_arguments() {
        let line = extractor().interactive_command(Path::new("/in/a.rar"));
        assert_eq!(line.args(), [OsString::from("/in/a.rar")]);
    }

    #[test]
    fn test_explicit_missing_tool() {
        let err = Extractor::at("/definitely/not/here/bz").unwrap_err();
        assert!(matches!(&*err, ErrorKind::ExtractorInvalid(_)));
    }
}
