//! # Execution manager module
//!
//! The execution manager runs a set of tasks cooperatively on a single
//! thread. Each iteration of the loop runs every registered task once, in
//! ascending priority order, then sleeps for whatever remains of the minimum
//! loop period. Iterations which take longer than the period are not dropped,
//! the loop simply runs late and the overrun is reported.
//!
//! Tasks deregister themselves by returning `false` from [`Task::run`]. The
//! loop ends when no task remains, or when shutdown has been requested
//! through a [`ShutdownHandle`], in which case the current iteration is
//! finished first.
//!
//! Tasks added while the loop is running, whether with
//! [`ExecutionManager::add_task`] or through a [`TaskSpawner`] held by a task,
//! are buffered and join the loop at the start of the next iteration.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Priority given to the first task registered without a priority.
pub const DEFAULT_FIRST_PRIORITY: i32 = 100;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A unit of work run once per iteration of the loop.
///
/// `D` is the data shared by all the tasks of the loop.
pub trait Task<D> {
    /// Run one iteration of the task.
    ///
    /// Returns `false` if the task has finished and should be removed from
    /// the loop.
    fn run(&mut self, data: &mut D) -> bool;

    /// Name of the task, used in the logs.
    fn name(&self) -> &str {
        "task"
    }
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A cooperative, priority ordered task loop.
pub struct ExecutionManager<D> {
    /// Registered tasks, sorted by priority then registration order
    tasks: Vec<Entry<D>>,

    /// Tasks waiting for the start of the next iteration
    pending: Vec<(Box<dyn Task<D>>, Option<i32>)>,

    spawn_sender: Sender<(Box<dyn Task<D>>, Option<i32>)>,
    spawn_receiver: Receiver<(Box<dyn Task<D>>, Option<i32>)>,

    /// Next priority given to tasks registered without one
    next_priority: i32,

    /// Registration counter, orders tasks of equal priority
    next_seq: u64,

    shutdown: ShutdownHandle,

    num_iterations: u64,

    /// Number of consecutive iterations which overran the loop period
    num_consec_overruns: u64,
}

/// Adds tasks to an execution manager from within a running task.
pub struct TaskSpawner<D> {
    sender: Sender<(Box<dyn Task<D>>, Option<i32>)>,
}

/// Requests the end of the loop, from any thread.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

struct Entry<D> {
    priority: i32,
    seq: u64,
    task: Box<dyn Task<D>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<D> ExecutionManager<D> {
    pub fn new() -> Self {
        let (spawn_sender, spawn_receiver) = channel();

        Self {
            tasks: Vec::new(),
            pending: Vec::new(),
            spawn_sender,
            spawn_receiver,
            next_priority: DEFAULT_FIRST_PRIORITY,
            next_seq: 0,
            shutdown: ShutdownHandle::default(),
            num_iterations: 0,
            num_consec_overruns: 0,
        }
    }

    /// Register a new task.
    ///
    /// Lower priorities run first. If no priority is given the task gets the
    /// next default priority, which starts at [`DEFAULT_FIRST_PRIORITY`] and
    /// increases by one with each task registered without a priority.
    ///
    /// The task joins the loop at the start of the next iteration.
    pub fn add_task<T>(&mut self, task: T, priority: Option<i32>)
    where
        T: Task<D> + 'static,
    {
        self.pending.push((Box::new(task), priority));
    }

    /// Get a spawner which can add tasks to this manager while it's running.
    pub fn spawner(&self) -> TaskSpawner<D> {
        TaskSpawner {
            sender: self.spawn_sender.clone(),
        }
    }

    /// Get a handle which can stop the loop.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Request the end of the loop, which happens after the current
    /// iteration.
    pub fn shutdown(&self) {
        self.shutdown.request();
    }

    /// Number of registered tasks, including those waiting to join.
    pub fn num_tasks(&self) -> usize {
        self.tasks.len() + self.pending.len()
    }

    pub fn num_iterations(&self) -> u64 {
        self.num_iterations
    }

    pub fn num_consec_overruns(&self) -> u64 {
        self.num_consec_overruns
    }

    /// Run the loop until no task remains or shutdown is requested, with
    /// iterations lasting at least `min_loop_duration`.
    ///
    /// The tasks remaining when the loop ends are dropped.
    pub fn run(&mut self, data: &mut D, min_loop_duration: Duration) {
        info!("Execution manager started");

        while !self.shutdown.is_requested() {
            let iteration_start = Instant::now();

            if !self.run_once(data) {
                info!("No task remaining");
                break;
            }

            // ---- LOOP PACING ----

            let iteration_dur = iteration_start.elapsed();

            match min_loop_duration.checked_sub(iteration_dur) {
                Some(d) => {
                    self.num_consec_overruns = 0;
                    thread::sleep(d);
                }
                None => {
                    self.num_consec_overruns += 1;
                    warn!(
                        "Iteration overran by {:.06} s ({} consecutive overruns)",
                        (iteration_dur - min_loop_duration).as_secs_f64(),
                        self.num_consec_overruns
                    );
                }
            }
        }

        if self.shutdown.is_requested() {
            info!("Shutdown requested");
        }

        info!(
            "Execution manager stopped after {} iterations, dropping {} tasks",
            self.num_iterations,
            self.num_tasks()
        );

        self.tasks.clear();
        self.pending.clear();
    }

    /// Run a single iteration of the loop, without any pacing.
    ///
    /// Returns `false` if there were no tasks to run.
    pub fn run_once(&mut self, data: &mut D) -> bool {
        self.register_pending();

        if self.tasks.is_empty() {
            return false;
        }

        let mut i = 0;
        while i < self.tasks.len() {
            if self.tasks[i].task.run(data) {
                i += 1;
            } else {
                let entry = self.tasks.remove(i);
                debug!(
                    "Task {} (priority {}) finished",
                    entry.task.name(),
                    entry.priority
                );
            }
        }

        self.num_iterations += 1;

        true
    }

    /// Move the buffered tasks into the loop.
    fn register_pending(&mut self) {
        while let Ok(t) = self.spawn_receiver.try_recv() {
            self.pending.push(t);
        }

        for (task, priority) in self.pending.drain(..) {
            let priority = match priority {
                Some(p) => p,
                None => {
                    let p = self.next_priority;
                    self.next_priority += 1;
                    p
                }
            };

            let seq = self.next_seq;
            self.next_seq += 1;

            debug!("Task {} registered with priority {}", task.name(), priority);

            // Insert after every task of lower or equal priority
            let index = self.tasks.partition_point(|e| e.priority <= priority);
            self.tasks.insert(index, Entry { priority, seq, task });
        }

        debug_assert!(self
            .tasks
            .windows(2)
            .all(|w| (w[0].priority, w[0].seq) < (w[1].priority, w[1].seq)));
    }
}

impl<D> Default for ExecutionManager<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> TaskSpawner<D> {
    /// Add a task to the manager, see [`ExecutionManager::add_task`].
    pub fn add_task<T>(&self, task: T, priority: Option<i32>)
    where
        T: Task<D> + 'static,
    {
        if self.sender.send((Box::new(task), priority)).is_err() {
            warn!("Execution manager is gone, task not added");
        }
    }
}

impl<D> Clone for TaskSpawner<D> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl ShutdownHandle {
    /// Request the end of the loop.
    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request the end of the loop when Ctrl-C is pressed.
    pub fn set_ctrlc_handler(&self) -> Result<(), ctrlc::Error> {
        let handle = self.clone();
        ctrlc::set_handler(move || {
            warn!("Ctrl-C received, stopping");
            handle.request();
        })
    }
}
