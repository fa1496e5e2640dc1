pub mod config;
pub mod constants;
pub mod corrections;
pub mod env;
pub mod progress_bars;

/// Memory in use on this host, in MB.
pub fn get_memory_usage() -> u64 {
    use sysinfo::System;
    let mut sys = System::new_all();
    sys.refresh_memory();
    sys.used_memory() / (1024 * 1024)
}
