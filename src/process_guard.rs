//! Process lifecycle management for child processes
//!
//! The launcher never outlives its children silently and its children never
//! outlive the launcher:
//! - Pre-flight steps carry a parent-death signal, so killing the launcher
//!   kills the running step.
//! - A supervised server runs in its own process group, is tracked in a
//!   global registry, and receives every termination signal the launcher
//!   gets.
//! - If the supervisor unwinds while the server is still registered, the
//!   group gets SIGTERM, then SIGKILL after a grace period.

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Signals relayed from the launcher to a supervised server.
pub const FORWARDED_SIGNALS: [i32; 4] = [SIGINT, SIGTERM, SIGHUP, SIGQUIT];

/// Global registry of child process IDs
static CHILD_REGISTRY: OnceLock<Arc<Mutex<ChildRegistry>>> = OnceLock::new();

/// Registry tracking spawned child process groups
#[derive(Debug, Default)]
pub struct ChildRegistry {
    /// Group leader PIDs currently running
    pids: HashSet<u32>,
}

impl ChildRegistry {
    /// Get or create the global child registry
    pub fn global() -> Arc<Mutex<ChildRegistry>> {
        CHILD_REGISTRY
            .get_or_init(|| Arc::new(Mutex::new(ChildRegistry::default())))
            .clone()
    }

    pub fn register(&mut self, pid: u32) {
        self.pids.insert(pid);
        debug!("Registered child process PID {}", pid);
    }

    /// Unregister a child process (called when it exits normally)
    pub fn unregister(&mut self, pid: u32) {
        self.pids.remove(&pid);
        debug!("Unregistered child process PID {}", pid);
    }

    pub fn count(&self) -> usize {
        self.pids.len()
    }

    /// Relay `sig` to every tracked process group.
    ///
    /// Returns how many groups the signal was delivered to.
    pub fn forward(&self, sig: Signal) -> usize {
        let mut delivered = 0;
        for &pid in &self.pids {
            match send_signal_to_group(pid, sig) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!("Failed to forward {} to process group {}: {}", sig, pid, e);
                    if send_signal(pid, sig).is_ok() {
                        delivered += 1;
                    }
                }
            }
        }
        delivered
    }

    /// Terminate the given tracked process groups.
    /// Sends SIGTERM first, waits up to `grace_period`, then SIGKILL
    pub fn terminate(&mut self, pids: &[u32], grace_period: Duration) {
        let pids_to_kill: Vec<u32> = pids
            .iter()
            .copied()
            .filter(|pid| self.pids.contains(pid))
            .collect();
        if pids_to_kill.is_empty() {
            debug!("No child processes to terminate");
            return;
        }

        info!("Terminating {} child process(es)...", pids_to_kill.len());

        for &pid in &pids_to_kill {
            if send_signal_to_group(pid, Signal::SIGTERM).is_err() {
                let _ = send_signal(pid, Signal::SIGTERM);
            }
        }

        let start = Instant::now();
        let mut graceful = false;
        while start.elapsed() < grace_period {
            if !pids_to_kill.iter().any(|&pid| is_process_alive(pid)) {
                graceful = true;
                break;
            }
            thread::sleep(Duration::from_millis(100));
        }

        if graceful {
            info!("All child processes terminated gracefully");
        } else {
            for &pid in &pids_to_kill {
                if is_process_alive(pid) {
                    warn!("Process group {} did not terminate, sending SIGKILL", pid);
                    if send_signal_to_group(pid, Signal::SIGKILL).is_err() {
                        let _ = send_signal(pid, Signal::SIGKILL);
                    }
                }
            }
            info!("Child process cleanup complete");
        }

        for pid in &pids_to_kill {
            self.pids.remove(pid);
        }
    }
}

/// Send a signal to a process
fn send_signal(pid: u32, sig: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(pid as i32), sig)
}

/// Send a signal to an entire process group (negative PID)
fn send_signal_to_group(pgid: u32, sig: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(-(pgid as i32)), sig)
}

/// Check if a process is still alive (not dead or zombie)
pub fn is_process_alive(pid: u32) -> bool {
    if signal::kill(Pid::from_raw(pid as i32), None).is_err() {
        return false;
    }

    // Field 3 of /proc/pid/stat is the state; Z and X are not running
    if let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        let fields: Vec<&str> = stat.split_whitespace().collect();
        if fields.len() > 2 {
            return !matches!(fields[2], "Z" | "X");
        }
    }

    true
}

/// RAII guard that tears down the children it registered on drop.
///
/// Held by the supervisor for as long as the server runs. On the normal path
/// the child is unregistered before the guard drops, so nothing is signalled.
pub struct ProcessGuard {
    registry: Arc<Mutex<ChildRegistry>>,
    owned: RefCell<Vec<u32>>,
    grace_period: Duration,
}

impl ProcessGuard {
    pub fn new(grace_period: Duration) -> Self {
        Self {
            registry: ChildRegistry::global(),
            owned: RefCell::new(Vec::new()),
            grace_period,
        }
    }

    pub fn register_child(&self, pid: u32) {
        if let Ok(mut registry) = self.registry.lock() {
            registry.register(pid);
            self.owned.borrow_mut().push(pid);
        }
    }

    pub fn unregister_child(&self, pid: u32) {
        if let Ok(mut registry) = self.registry.lock() {
            registry.unregister(pid);
        }
        self.owned.borrow_mut().retain(|&p| p != pid);
    }

    /// Children registered through this guard and still running.
    pub fn child_count(&self) -> usize {
        self.owned.borrow().len()
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        let owned = self.owned.take();
        if owned.is_empty() {
            return;
        }
        debug!("ProcessGuard dropped with live children, initiating cleanup");
        if let Ok(mut registry) = self.registry.lock() {
            registry.terminate(&owned, self.grace_period);
        }
    }
}

/// Relay termination signals to every registered child group.
///
/// The launcher itself does not exit on these signals; it waits for the
/// server to react and then exits with the server's status. Close the
/// returned handle once the server is gone.
pub fn init_signal_forwarding() -> Result<Handle, std::io::Error> {
    let mut signals = Signals::new(FORWARDED_SIGNALS)?;
    let handle = signals.handle();

    thread::spawn(move || {
        for sig in signals.forever() {
            let Ok(signal) = Signal::try_from(sig) else {
                continue;
            };
            let delivered = ChildRegistry::global()
                .lock()
                .map(|registry| registry.forward(signal))
                .unwrap_or(0);
            info!("Forwarded {} to {} child group(s)", signal, delivered);
        }
    });

    Ok(handle)
}

/// Extension trait for std::process::Command to tie children to the launcher
pub trait CommandProcessGroup {
    /// Run the command as leader of its own process group, dying with the parent
    fn in_new_process_group(&mut self) -> &mut Self;

    /// Keep the caller's process group but die if the parent dies
    fn die_with_parent(&mut self) -> &mut Self;
}

impl CommandProcessGroup for std::process::Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        unsafe {
            self.pre_exec(|| {
                nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0))
                    .map_err(std::io::Error::other)?;
                set_parent_death_signal()
            });
        }
        self
    }

    fn die_with_parent(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        unsafe {
            self.pre_exec(set_parent_death_signal);
        }
        self
    }
}

#[cfg(target_os = "linux")]
fn set_parent_death_signal() -> std::io::Result<()> {
    use nix::libc;
    if unsafe { libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) } == -1 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn set_parent_death_signal() -> std::io::Result<()> {
    Ok(())
}
