use std::{path::PathBuf, time::Duration};

use uuid::Uuid;

pub fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("fileproc-{label}-{}", Uuid::now_v7()));
    std::fs::create_dir_all(&dir).expect("temp dir should be created");
    dir
}

/// A killed process that nobody has reaped yet still counts as gone.
#[cfg(target_os = "linux")]
fn process_is_gone(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next())
            .is_some_and(|state| state == "Z" || state == "X"),
        Err(_) => true,
    }
}

#[cfg(target_os = "linux")]
pub async fn wait_until_gone(pid: u32) -> bool {
    for _ in 0..100 {
        if process_is_gone(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    process_is_gone(pid)
}
