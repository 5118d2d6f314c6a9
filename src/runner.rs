use crate::args::ArgumentList;
use crate::logging::Logger;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;

/// Marker older Flyway releases print when a migration fails without a
/// nonzero exit code.
pub const ERROR_MARKER: &str = "Errors:";

/// Executes a composed command line and reports its exit code.
pub trait ProcessRunner {
    fn run(&self, args: &ArgumentList, log: &Logger) -> Result<i32, String>;
}

/// Runs the command as a local child process, streaming both output
/// pipes into the log and optionally into a file.
#[derive(Debug, Default)]
pub struct SystemRunner {
    pub workdir: Option<PathBuf>,
    pub output_log: Option<PathBuf>,
}

impl ProcessRunner for SystemRunner {
    fn run(&self, args: &ArgumentList, log: &Logger) -> Result<i32, String> {
        if args.is_empty() {
            return Err("empty command line".into());
        }
        let argv = args.as_slice();
        let tee = match &self.output_log {
            Some(path) => Some(Mutex::new(
                File::create(path).map_err(|e| format!("creating output log {:?}: {}", path, e))?,
            )),
            None => None,
        };
        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..]);
        if let Some(d) = &self.workdir {
            cmd.current_dir(d);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        let mut child = cmd
            .spawn()
            .map_err(|e| format!("starting command {:?}: {}", argv[0], e))?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (out_err, err_err) = std::thread::scope(|s| {
            let h1 = s.spawn(|| stdout.and_then(|r| stream_lines(log, r, "stdout", tee.as_ref())));
            let h2 = s.spawn(|| stderr.and_then(|r| stream_lines(log, r, "stderr", tee.as_ref())));
            (h1.join().ok().flatten(), h2.join().ok().flatten())
        });
        let status = child
            .wait()
            .map_err(|e| format!("waiting for command: {}", e))?;
        if let Some(e) = out_err.or(err_err) {
            return Err(format!("writing output log: {}", e));
        }
        Ok(status.code().unwrap_or(-1))
    }
}

/// Log every line and copy it, masked, to `tee`. Returns the first write
/// failure; the pipe is still drained after one so the child never blocks.
fn stream_lines<R: Read>(
    log: &Logger,
    reader: R,
    stream: &str,
    tee: Option<&Mutex<File>>,
) -> Option<std::io::Error> {
    let mut write_err = None;
    let buf = BufReader::new(reader);
    for l in buf.lines().map_while(Result::ok) {
        log.info(&l, &[("stream", stream)]);
        if write_err.is_some() {
            continue;
        }
        if let Some(file) = tee {
            let mut f = file.lock().unwrap_or_else(|p| p.into_inner());
            if let Err(e) = writeln!(f, "{}", log.mask(&l)).and_then(|_| f.flush()) {
                write_err = Some(e);
            }
        }
    }
    write_err
}

/// 1-based number of the first line containing [`ERROR_MARKER`]. Reading
/// stops at that line.
pub fn find_error_marker(path: &Path) -> std::io::Result<Option<usize>> {
    let reader = BufReader::new(File::open(path)?);
    for (i, line) in reader.lines().enumerate() {
        if line?.contains(ERROR_MARKER) {
            return Ok(Some(i + 1));
        }
    }
    Ok(None)
}
