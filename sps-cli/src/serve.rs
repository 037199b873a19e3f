//! `sps serve`: a small registry of demo wrapper functions on a Unix socket.

use sps::{SpsExpected, SpsSequence, SpsString, WrapperFunctionResult};
use sps_wrapper::{FnTag, Registry};

/// Functions served by `sps serve`, as `(tag, signature, summary)`.
pub(crate) const FUNCTIONS: &[(u64, &str, &str)] = &[
    (0, "*", "echo the argument bytes unchanged"),
    (1, "expected<u64>(u64, u64)", "checked addition"),
    (2, "string(string)", "uppercase"),
    (3, "u64(seq<u64>)", "wrapping sum"),
    (4, "error(string)", "fails on an empty string"),
];

pub(crate) fn registry() -> Registry {
    let mut reg = Registry::new();
    reg.register_raw(FnTag(0), WrapperFunctionResult::copy_from)
        .register::<fn(u64, u64) -> SpsExpected<u64>, _, _, _>(FnTag(1), |a: u64, b: u64| {
            a.checked_add(b)
                .ok_or_else(|| format!("{a} + {b} overflows u64"))
        })
        .register::<fn(SpsString) -> SpsString, _, _, _>(FnTag(2), |s: String| s.to_uppercase())
        .register::<fn(SpsSequence<u64>) -> u64, _, _, _>(FnTag(3), |v: Vec<u64>| {
            v.into_iter().fold(0u64, u64::wrapping_add)
        })
        .register::<fn(SpsString) -> sps::SpsError, _, _, _>(FnTag(4), |s: String| {
            if s.is_empty() {
                Err("empty input")
            } else {
                Ok(())
            }
        });
    reg
}

#[cfg(unix)]
pub(crate) fn run(socket: &std::path::Path) -> anyhow::Result<()> {
    use std::os::unix::fs::FileTypeExt;
    use std::os::unix::net::UnixListener;
    use std::sync::Arc;

    use anyhow::Context;

    // Only a stale socket from a previous run is removed.
    if let Ok(meta) = std::fs::symlink_metadata(socket) {
        anyhow::ensure!(
            meta.file_type().is_socket(),
            "{} exists and is not a socket",
            socket.display()
        );
        std::fs::remove_file(socket)
            .with_context(|| format!("failed to remove stale socket {}", socket.display()))?;
    }

    let listener = UnixListener::bind(socket)
        .with_context(|| format!("failed to bind {}", socket.display()))?;
    eprintln!("listening on {}", socket.display());
    for (tag, sig, summary) in FUNCTIONS {
        eprintln!("  {tag:>2}  {sig:<26} {summary}");
    }

    sps_wrapper::serve_unix(&listener, Arc::new(registry()))?;
    std::fs::remove_file(socket).ok();
    Ok(())
}
