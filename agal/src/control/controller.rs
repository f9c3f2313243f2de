use super::{CancellationToken, StartGate, StopCondition};
use crate::errors::ControlError;
use crate::evolution::{EvolutionAlgorithm, EvolutionEvent, EvolutionListener};

use parking_lot::{Condvar, Mutex};

use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// The lifecycle phases of an [`EvolutionController`].
///
/// Phases only ever advance, in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// Constructed, not yet started.
    Created,
    /// Workers are being spawned.
    Starting,
    /// Workers are evolving.
    Running,
    /// Workers have been told to stop and
    /// are being waited for.
    Stopping,
    /// All workers have terminated, or
    /// the remaining ones were abandoned.
    Stopped,
}

struct Lifecycle {
    phase: Phase,
    cancel_requested: bool,
    abandon_requested: bool,
    finished: Vec<bool>,
}

/// State shared between a controller, its
/// threads and any stop handles.
struct Shared {
    lifecycle: Mutex<Lifecycle>,
    changed: Condvar,
    token: CancellationToken,
    gate: StartGate,
}

impl Shared {
    fn new(workers: usize) -> Shared {
        Shared {
            lifecycle: Mutex::new(Lifecycle {
                phase: Phase::Created,
                cancel_requested: false,
                abandon_requested: false,
                finished: vec![false; workers],
            }),
            changed: Condvar::new(),
            token: CancellationToken::new(),
            gate: StartGate::new(),
        }
    }

    /// Returns `false` if cancellation had already been requested.
    fn request_cancel(&self) -> bool {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.cancel_requested {
            return false;
        }
        lifecycle.cancel_requested = true;
        self.changed.notify_all();
        true
    }

    fn set_phase(&self, phase: Phase) {
        self.lifecycle.lock().phase = phase;
        self.changed.notify_all();
        tracing::info!(?phase, "evolution controller phase changed");
    }

    fn phase(&self) -> Phase {
        self.lifecycle.lock().phase
    }
}

/// A handle through which a controller
/// can be asked to stop.
#[derive(Clone)]
pub struct StopHandle {
    shared: Arc<Shared>,
}

impl StopHandle {
    /// Requests cooperative cancellation of the
    /// controller's workers. Repeated requests are no-ops.
    pub fn request_stop(&self) {
        if self.shared.request_cancel() {
            tracing::info!("evolution stop requested");
        }
    }
}

#[cfg(test)]
impl StopHandle {
    /// A handle to a controller that was never created.
    pub(crate) fn unattached() -> StopHandle {
        StopHandle {
            shared: Arc::new(Shared::new(0)),
        }
    }

    pub(crate) fn is_stop_requested(&self) -> bool {
        self.shared.lifecycle.lock().cancel_requested
    }
}

impl fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopHandle")
            .field("phase", &self.shared.phase())
            .finish()
    }
}

/// Forwards engine events to a stop condition.
struct StopListener<S> {
    condition: Arc<dyn StopCondition<S>>,
}

impl<S> EvolutionListener<S> for StopListener<S> {
    fn on_event(&self, event: &EvolutionEvent<'_, S>) {
        self.condition.on_event(event);
    }
}

/// Marks a worker as finished when dropped,
/// including when the worker panics.
struct Finished<'a> {
    shared: &'a Shared,
    index: usize,
}

impl Drop for Finished<'_> {
    fn drop(&mut self) {
        let mut lifecycle = self.shared.lifecycle.lock();
        if let Some(finished) = lifecycle.finished.get_mut(self.index) {
            *finished = true;
        }
        self.shared.changed.notify_all();
    }
}

/// Runs an evolution engine on a fixed pool of worker
/// threads, supervised by a control thread.
///
/// Starting the controller spawns every worker, each of
/// which waits on a shared start gate, then the supervisor,
/// which opens the gate so that all workers begin together.
/// The supervisor then waits to be cancelled, either directly
/// or by a [`StopCondition`], after which it cancels the
/// workers and joins them one by one in spawn order.
///
/// # Examples
/// ```
/// use agal::control::{CancellationToken, EvolutionController, GenerationLimitStop, StopCondition};
/// use agal::evolution::{EvolutionAlgorithm, EvolutionEvent, EvolutionListener, Listeners};
/// use std::sync::Arc;
///
/// /// Reports a new generation on every step.
/// #[derive(Default)]
/// struct Ticker {
///     listeners: Listeners<()>,
/// }
///
/// impl EvolutionAlgorithm for Ticker {
///     type Member = ();
///
///     fn evolve(&self, token: &CancellationToken) {
///         let mut generation = 0;
///         while !token.is_cancelled() {
///             generation += 1;
///             self.listeners.notify(&EvolutionEvent::NewGeneration(generation));
///         }
///     }
///
///     fn register_listener(&self, listener: Arc<dyn EvolutionListener<()>>) {
///         self.listeners.register(listener);
///     }
/// }
///
/// let stop: Arc<dyn StopCondition<()>> = Arc::new(GenerationLimitStop::new(100));
/// let controller = EvolutionController::new(Arc::new(Ticker::default()), 2, vec![stop.clone()]);
///
/// controller.start().unwrap();
/// controller.await_termination().unwrap();
/// assert!(stop.trigger().has_fired());
/// ```
pub struct EvolutionController<E: EvolutionAlgorithm> {
    engine: Arc<E>,
    workers: usize,
    shared: Arc<Shared>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl<E: EvolutionAlgorithm> EvolutionController<E> {
    /// Creates a controller running `engine` on `workers`
    /// threads. Every condition in `conditions` is bound to
    /// this controller and registered as a listener on
    /// `engine`. A condition already bound to an earlier
    /// controller is rebound and rearmed.
    ///
    /// A controller with no workers still starts, waits to be
    /// cancelled and stops, it just performs no evolution.
    pub fn new(
        engine: Arc<E>,
        workers: usize,
        conditions: Vec<Arc<dyn StopCondition<E::Member>>>,
    ) -> EvolutionController<E> {
        let shared = Arc::new(Shared::new(workers));

        for condition in conditions {
            condition.trigger().bind(StopHandle {
                shared: Arc::clone(&shared),
            });
            engine.register_listener(Arc::new(StopListener { condition }));
        }

        EvolutionController {
            engine,
            workers,
            shared,
            supervisor: Mutex::new(None),
        }
    }

    /// Returns the engine being run.
    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// Returns the number of worker threads.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Returns the current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.shared.phase()
    }

    /// Returns a handle that can stop this controller
    /// from elsewhere.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Spawns the workers and the supervisor, and releases
    /// the workers to begin evolving.
    ///
    /// # Errors
    /// Returns an error if the controller was already started,
    /// or if a thread could not be spawned. In the latter case
    /// any workers already spawned are stopped before returning.
    pub fn start(&self) -> Result<(), ControlError> {
        {
            let mut lifecycle = self.shared.lifecycle.lock();
            if lifecycle.phase != Phase::Created {
                return Err(ControlError::AlreadyStarted);
            }
            lifecycle.phase = Phase::Starting;
        }
        tracing::info!(workers = self.workers, "starting evolution controller");

        let mut handles = Vec::with_capacity(self.workers);
        for index in 0..self.workers {
            match self.spawn_worker(index) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    self.shared.token.cancel();
                    self.shared.gate.open();
                    for handle in handles {
                        let _ = handle.join();
                    }
                    self.shared.set_phase(Phase::Stopped);
                    return Err(ControlError::Spawn(e));
                }
            }
        }

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("evolution-control".into())
            .spawn(move || supervise(&shared, handles));
        match spawned {
            Ok(supervisor) => {
                *self.supervisor.lock() = Some(supervisor);
                Ok(())
            }
            Err(e) => {
                // The worker handles went down with the closure;
                // the workers exit as soon as they pass the gate.
                self.shared.token.cancel();
                self.shared.gate.open();
                self.shared.set_phase(Phase::Stopped);
                Err(ControlError::Spawn(e))
            }
        }
    }

    fn spawn_worker(&self, index: usize) -> io::Result<JoinHandle<()>> {
        let engine = Arc::clone(&self.engine);
        let shared = Arc::clone(&self.shared);
        thread::Builder::new()
            .name(format!("evolution-worker-{}", index))
            .spawn(move || {
                let _finished = Finished {
                    shared: &shared,
                    index,
                };
                shared.gate.wait();
                if shared.token.is_cancelled() {
                    tracing::debug!(worker = index, "worker cancelled before starting");
                    return;
                }
                tracing::debug!(worker = index, "worker started");
                engine.evolve(&shared.token);
                tracing::debug!(worker = index, "worker stopped");
            })
    }

    /// Asks the controller to stop. Workers finish their
    /// current breeding step before stopping. Cancelling
    /// more than once, or after stopping, has no effect.
    pub fn cancel(&self) {
        if self.shared.request_cancel() {
            tracing::info!("evolution cancelled");
        }
    }

    /// Cancels the controller and stops it waiting for any
    /// workers that have not yet terminated. Those workers
    /// are left running unsupervised until they notice the
    /// cancellation on their own.
    pub fn abandon(&self) {
        {
            let mut lifecycle = self.shared.lifecycle.lock();
            lifecycle.cancel_requested = true;
            lifecycle.abandon_requested = true;
        }
        self.shared.changed.notify_all();
        tracing::warn!("evolution workers abandoned");
    }

    /// Blocks until the controller has stopped.
    ///
    /// # Errors
    /// Returns an error if the controller was never started,
    /// or if the supervising thread panicked.
    pub fn await_termination(&self) -> Result<(), ControlError> {
        let supervisor = self.supervisor.lock().take();
        match supervisor {
            Some(supervisor) => supervisor
                .join()
                .map_err(|_| ControlError::SupervisorPanicked)?,
            None => {
                let mut lifecycle = self.shared.lifecycle.lock();
                if lifecycle.phase == Phase::Created {
                    return Err(ControlError::NotStarted);
                }
                while lifecycle.phase != Phase::Stopped {
                    self.shared.changed.wait(&mut lifecycle);
                }
            }
        }
        tracing::info!("evolution controller terminated");
        Ok(())
    }
}

/// The supervisor's body: release the workers, wait to be
/// cancelled, then cancel and join every worker in order.
fn supervise(shared: &Shared, workers: Vec<JoinHandle<()>>) {
    shared.gate.open();
    shared.set_phase(Phase::Running);

    {
        let mut lifecycle = shared.lifecycle.lock();
        while !lifecycle.cancel_requested {
            shared.changed.wait(&mut lifecycle);
        }
    }

    shared.set_phase(Phase::Stopping);
    shared.token.cancel();

    let total = workers.len();
    for (index, worker) in workers.into_iter().enumerate() {
        let finished = {
            let mut lifecycle = shared.lifecycle.lock();
            loop {
                let finished = lifecycle.finished.get(index).copied().unwrap_or(true);
                if finished || lifecycle.abandon_requested {
                    break finished;
                }
                shared.changed.wait(&mut lifecycle);
            }
        };
        if !finished {
            tracing::warn!(
                remaining = total - index,
                "stopped waiting for evolution workers"
            );
            break;
        }
        if worker.join().is_err() {
            tracing::warn!(worker = index, "evolution worker panicked");
        }
    }

    shared.set_phase(Phase::Stopped);
}

impl<E: EvolutionAlgorithm> Drop for EvolutionController<E> {
    fn drop(&mut self) {
        if let Some(supervisor) = self.supervisor.get_mut().take() {
            self.shared.request_cancel();
            let _ = supervisor.join();
        }
    }
}

impl<E: EvolutionAlgorithm> fmt::Debug for EvolutionController<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvolutionController")
            .field("workers", &self.workers)
            .field("phase", &self.phase())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::StopTrigger;
    use crate::evolution::Listeners;

    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Spinner {
        listeners: Listeners<u64>,
        begins: AtomicUsize,
        ends: AtomicUsize,
    }

    impl EvolutionAlgorithm for Spinner {
        type Member = u64;

        fn evolve(&self, token: &CancellationToken) {
            self.begins.fetch_add(1, Ordering::SeqCst);
            self.listeners.notify(&EvolutionEvent::Begin);

            let member = Arc::new(0);
            while !token.is_cancelled() {
                self.listeners.notify(&EvolutionEvent::MemberAdded(&member));
                thread::yield_now();
            }

            self.listeners.notify(&EvolutionEvent::End);
            self.ends.fetch_add(1, Ordering::SeqCst);
        }

        fn register_listener(&self, listener: Arc<dyn EvolutionListener<u64>>) {
            self.listeners.register(listener);
        }
    }

    /// Ignores cancellation until released.
    #[derive(Default)]
    struct Stubborn {
        released: AtomicBool,
        running: AtomicBool,
    }

    impl EvolutionAlgorithm for Stubborn {
        type Member = u64;

        fn evolve(&self, _token: &CancellationToken) {
            self.running.store(true, Ordering::SeqCst);
            while !self.released.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
            self.running.store(false, Ordering::SeqCst);
        }

        fn register_listener(&self, _listener: Arc<dyn EvolutionListener<u64>>) {}
    }

    struct EventLimit {
        limit: usize,
        seen: AtomicUsize,
        trigger: StopTrigger,
    }

    impl EventLimit {
        fn new(limit: usize) -> EventLimit {
            EventLimit {
                limit,
                seen: AtomicUsize::new(0),
                trigger: StopTrigger::new(),
            }
        }
    }

    impl EvolutionListener<u64> for EventLimit {
        fn on_event(&self, event: &EvolutionEvent<'_, u64>) {
            if let EvolutionEvent::MemberAdded(_) = event {
                if self.seen.fetch_add(1, Ordering::SeqCst) + 1 >= self.limit {
                    self.trigger.request_stop();
                }
            }
        }
    }

    impl StopCondition<u64> for EventLimit {
        fn trigger(&self) -> &StopTrigger {
            &self.trigger
        }
    }

    #[test]
    fn zero_workers_runs_to_completion() {
        let controller = EvolutionController::new(Arc::new(Spinner::default()), 0, vec![]);
        assert_eq!(controller.phase(), Phase::Created);

        controller.start().unwrap();
        controller.cancel();
        controller.await_termination().unwrap();

        assert_eq!(controller.phase(), Phase::Stopped);
        assert_eq!(controller.engine().begins.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn stop_condition_terminates_every_worker() {
        const WORKERS: usize = 4;
        let engine = Arc::new(Spinner::default());
        let stop = Arc::new(EventLimit::new(1000));
        let controller = EvolutionController::new(
            engine.clone(),
            WORKERS,
            vec![stop.clone() as Arc<dyn StopCondition<u64>>],
        );

        controller.start().unwrap();
        controller.await_termination().unwrap();

        assert!(stop.trigger.has_fired());
        assert!(stop.seen.load(Ordering::SeqCst) >= 1000);
        assert_eq!(controller.phase(), Phase::Stopped);
        assert_eq!(engine.begins.load(Ordering::SeqCst), WORKERS);
        assert_eq!(engine.ends.load(Ordering::SeqCst), WORKERS);
        // Only the controller and this test still hold the engine.
        assert_eq!(Arc::strong_count(&engine), 2);
    }

    #[test]
    fn condition_stops_successive_controllers() {
        let stop = Arc::new(EventLimit::new(100));
        for _ in 0..2 {
            let controller = EvolutionController::new(
                Arc::new(Spinner::default()),
                2,
                vec![stop.clone() as Arc<dyn StopCondition<u64>>],
            );
            assert!(!stop.trigger.has_fired());

            controller.start().unwrap();
            controller.await_termination().unwrap();

            assert!(stop.trigger.has_fired());
            assert_eq!(controller.phase(), Phase::Stopped);
        }
    }

    #[test]
    fn cancellation_is_idempotent() {
        let controller = EvolutionController::new(Arc::new(Spinner::default()), 2, vec![]);
        controller.cancel();
        controller.cancel();

        controller.start().unwrap();
        controller.cancel();
        controller.await_termination().unwrap();
        controller.cancel();
        controller.stop_handle().request_stop();

        assert_eq!(controller.phase(), Phase::Stopped);
        controller.await_termination().unwrap();
    }

    #[test]
    fn lifecycle_misuse_is_reported() {
        let controller = EvolutionController::new(Arc::new(Spinner::default()), 1, vec![]);
        assert!(matches!(
            controller.await_termination(),
            Err(ControlError::NotStarted)
        ));

        controller.start().unwrap();
        assert!(matches!(controller.start(), Err(ControlError::AlreadyStarted)));

        controller.stop_handle().request_stop();
        controller.await_termination().unwrap();
    }

    #[test]
    fn abandoning_stops_waiting() {
        let engine = Arc::new(Stubborn::default());
        let controller = EvolutionController::new(engine.clone(), 1, vec![]);

        controller.start().unwrap();
        while !engine.running.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(1));
        }
        controller.abandon();
        controller.await_termination().unwrap();

        assert_eq!(controller.phase(), Phase::Stopped);
        assert!(engine.running.load(Ordering::SeqCst));
        engine.released.store(true, Ordering::SeqCst);
    }
}
