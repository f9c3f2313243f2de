use super::StopHandle;
use crate::evolution::{EvolutionEvent, EvolutionListener};
use crate::fitness::FitnessEvaluator;

use arc_swap::ArcSwapOption;
use parking_lot::{Condvar, Mutex};

use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// The link between a stop condition and the
/// controller it may stop.
///
/// A trigger is bound to a controller when its condition
/// is handed to that controller, and fires at most once
/// per binding. Handing the condition to another controller
/// rebinds the trigger and rearms it.
pub struct StopTrigger {
    handle: ArcSwapOption<StopHandle>,
    fired: AtomicBool,
}

impl StopTrigger {
    pub fn new() -> StopTrigger {
        StopTrigger {
            handle: ArcSwapOption::empty(),
            fired: AtomicBool::new(false),
        }
    }

    pub(crate) fn bind(&self, handle: StopHandle) {
        if self.handle.swap(Some(Arc::new(handle))).is_some() {
            tracing::debug!("stop trigger rebound to a new controller");
        }
        self.fired.store(false, AtomicOrdering::Release);
    }

    /// Asks the bound controller to stop. Returns `true`
    /// if this call fired the trigger, and `false` if it
    /// had already fired or is not bound to a controller.
    pub fn request_stop(&self) -> bool {
        let Some(handle) = self.handle.load_full() else {
            tracing::warn!("stop trigger fired before being bound to a controller");
            return false;
        };
        if self.fired.swap(true, AtomicOrdering::AcqRel) {
            return false;
        }
        handle.request_stop();
        true
    }

    /// Returns whether the trigger has fired
    /// since it was last bound.
    pub fn has_fired(&self) -> bool {
        self.fired.load(AtomicOrdering::Acquire)
    }

    /// Returns whether the trigger is bound to a controller.
    pub fn is_bound(&self) -> bool {
        self.handle.load().is_some()
    }
}

impl Default for StopTrigger {
    fn default() -> StopTrigger {
        StopTrigger::new()
    }
}

impl fmt::Debug for StopTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopTrigger")
            .field("bound", &self.is_bound())
            .field("fired", &self.has_fired())
            .finish()
    }
}

/// A listener able to request cooperative
/// cancellation of a worker pool.
pub trait StopCondition<S>: EvolutionListener<S> {
    /// Returns the trigger through which
    /// this condition stops its controller.
    fn trigger(&self) -> &StopTrigger;
}

/// Stops evolution once a wall-clock duration has
/// elapsed since the first worker began.
///
/// The countdown runs on its own thread, which exits
/// early if evolution ends first. A countdown ended this
/// way is started afresh by the next run's first worker.
pub struct TimedStop {
    duration: Duration,
    trigger: Arc<StopTrigger>,
    countdown: Mutex<Option<Arc<Countdown>>>,
}

#[derive(Default)]
struct Countdown {
    ended: Mutex<bool>,
    signal: Condvar,
}

impl Countdown {
    fn run(&self, deadline: Instant, trigger: &StopTrigger) {
        let mut ended = self.ended.lock();
        while !*ended {
            if self.signal.wait_until(&mut ended, deadline).timed_out() {
                break;
            }
        }
        let expired = !*ended;
        drop(ended);

        if expired {
            tracing::debug!("evolution time limit reached");
            trigger.request_stop();
        }
    }

    fn end(&self) {
        *self.ended.lock() = true;
        self.signal.notify_all();
    }
}

impl TimedStop {
    pub fn new(duration: Duration) -> TimedStop {
        TimedStop {
            duration,
            trigger: Arc::new(StopTrigger::new()),
            countdown: Mutex::new(None),
        }
    }

    /// Returns the time limit.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Starts a countdown unless one is already running.
    fn begin(&self) {
        let mut countdown = self.countdown.lock();
        if countdown.is_some() {
            return;
        }
        let started = Arc::new(Countdown::default());
        let timer = Arc::clone(&started);
        let trigger = Arc::clone(&self.trigger);
        let deadline = Instant::now() + self.duration;
        let spawned = thread::Builder::new()
            .name("evolution-timer".into())
            .spawn(move || timer.run(deadline, &trigger));
        match spawned {
            Ok(_) => *countdown = Some(started),
            Err(e) => {
                tracing::warn!(error = %e, "could not start evolution timer, stopping now");
                self.trigger.request_stop();
            }
        }
    }

    fn end(&self) {
        if let Some(countdown) = self.countdown.lock().take() {
            countdown.end();
        }
    }
}

impl<S> EvolutionListener<S> for TimedStop {
    fn on_event(&self, event: &EvolutionEvent<'_, S>) {
        match event {
            EvolutionEvent::Begin => self.begin(),
            EvolutionEvent::End => self.end(),
            _ => {}
        }
    }
}

impl<S> StopCondition<S> for TimedStop {
    fn trigger(&self) -> &StopTrigger {
        &self.trigger
    }
}

impl fmt::Debug for TimedStop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimedStop")
            .field("duration", &self.duration)
            .field("trigger", &self.trigger)
            .finish()
    }
}

/// Stops evolution once a member at least as
/// fit as a threshold is added.
pub struct FitnessThresholdStop<F> {
    evaluator: F,
    threshold: i64,
    trigger: StopTrigger,
}

impl<F> FitnessThresholdStop<F> {
    /// Creates a condition firing on any added member whose
    /// fitness is `threshold` or better, in the direction
    /// of `evaluator`'s scale.
    pub fn new(evaluator: F, threshold: i64) -> FitnessThresholdStop<F> {
        FitnessThresholdStop {
            evaluator,
            threshold,
            trigger: StopTrigger::new(),
        }
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }
}

impl<S, F> EvolutionListener<S> for FitnessThresholdStop<F>
where
    F: FitnessEvaluator<S>,
{
    fn on_event(&self, event: &EvolutionEvent<'_, S>) {
        if let EvolutionEvent::MemberAdded(member) = event {
            let fitness = self.evaluator.fitness(member);
            if self.evaluator.compare_fitness(fitness, self.threshold) != Ordering::Less
                && self.trigger.request_stop()
            {
                tracing::debug!(fitness, "fitness threshold reached");
            }
        }
    }
}

impl<S, F> StopCondition<S> for FitnessThresholdStop<F>
where
    F: FitnessEvaluator<S>,
{
    fn trigger(&self) -> &StopTrigger {
        &self.trigger
    }
}

impl<F> fmt::Debug for FitnessThresholdStop<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FitnessThresholdStop")
            .field("threshold", &self.threshold)
            .field("trigger", &self.trigger)
            .finish()
    }
}

/// Stops evolution once the population has
/// completed a number of generations.
#[derive(Debug)]
pub struct GenerationLimitStop {
    limit: usize,
    trigger: StopTrigger,
}

impl GenerationLimitStop {
    pub fn new(limit: usize) -> GenerationLimitStop {
        GenerationLimitStop {
            limit,
            trigger: StopTrigger::new(),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl<S> EvolutionListener<S> for GenerationLimitStop {
    fn on_event(&self, event: &EvolutionEvent<'_, S>) {
        if let EvolutionEvent::NewGeneration(generation) = event {
            if *generation >= self.limit && self.trigger.request_stop() {
                tracing::debug!(generation, "generation limit reached");
            }
        }
    }
}

impl<S> StopCondition<S> for GenerationLimitStop {
    fn trigger(&self) -> &StopTrigger {
        &self.trigger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::FitnessDirection;

    struct Conflicts;

    impl FitnessEvaluator<i64> for Conflicts {
        fn fitness(&self, state: &i64) -> i64 {
            *state
        }

        fn direction(&self) -> FitnessDirection {
            FitnessDirection::LowerIsBetter
        }
    }

    fn bound(trigger: &StopTrigger) -> StopHandle {
        let handle = StopHandle::unattached();
        trigger.bind(handle.clone());
        handle
    }

    fn wait_for(condition: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn trigger_fires_once() {
        let trigger = StopTrigger::new();
        let handle = bound(&trigger);
        assert!(!trigger.has_fired());

        assert!(trigger.request_stop());
        assert!(!trigger.request_stop());
        assert!(trigger.has_fired());
        assert!(handle.is_stop_requested());
    }

    #[test]
    fn unbound_trigger_does_not_fire() {
        let trigger = StopTrigger::new();
        assert!(!trigger.is_bound());

        assert!(!trigger.request_stop());
        assert!(!trigger.has_fired());

        let handle = bound(&trigger);
        assert!(trigger.request_stop());
        assert!(handle.is_stop_requested());
    }

    #[test]
    fn rebinding_rearms_trigger() {
        let trigger = StopTrigger::new();
        let first = bound(&trigger);
        assert!(trigger.request_stop());

        let second = bound(&trigger);
        assert!(!trigger.has_fired());
        assert!(!second.is_stop_requested());

        assert!(trigger.request_stop());
        assert!(first.is_stop_requested());
        assert!(second.is_stop_requested());
    }

    #[test]
    fn threshold_respects_direction() {
        let stop = FitnessThresholdStop::new(Conflicts, 0);
        bound(&stop.trigger);

        stop.on_event(&EvolutionEvent::MemberAdded(&Arc::new(3)));
        assert!(!StopCondition::<i64>::trigger(&stop).has_fired());

        stop.on_event(&EvolutionEvent::MemberRemoved(&Arc::new(0)));
        assert!(!StopCondition::<i64>::trigger(&stop).has_fired());

        stop.on_event(&EvolutionEvent::MemberAdded(&Arc::new(0)));
        assert!(StopCondition::<i64>::trigger(&stop).has_fired());
    }

    #[test]
    fn generation_limit() {
        let stop = GenerationLimitStop::new(3);
        bound(&stop.trigger);

        EvolutionListener::<u8>::on_event(&stop, &EvolutionEvent::NewGeneration(2));
        assert!(!stop.trigger.has_fired());

        EvolutionListener::<u8>::on_event(&stop, &EvolutionEvent::NewGeneration(3));
        assert!(stop.trigger.has_fired());
    }

    #[test]
    fn timer_fires_after_duration() {
        let stop = TimedStop::new(Duration::from_millis(20));
        let handle = bound(&stop.trigger);
        EvolutionListener::<u8>::on_event(&stop, &EvolutionEvent::Begin);
        EvolutionListener::<u8>::on_event(&stop, &EvolutionEvent::Begin);

        assert!(wait_for(|| stop.trigger.has_fired()));
        assert!(handle.is_stop_requested());
    }

    #[test]
    fn ending_cancels_timer() {
        let stop = TimedStop::new(Duration::from_millis(50));
        bound(&stop.trigger);
        EvolutionListener::<u8>::on_event(&stop, &EvolutionEvent::Begin);
        EvolutionListener::<u8>::on_event(&stop, &EvolutionEvent::End);

        thread::sleep(Duration::from_millis(150));
        assert!(!stop.trigger.has_fired());
    }

    #[test]
    fn timer_restarts_for_next_run() {
        let stop = TimedStop::new(Duration::from_millis(20));
        bound(&stop.trigger);
        EvolutionListener::<u8>::on_event(&stop, &EvolutionEvent::Begin);
        assert!(wait_for(|| stop.trigger.has_fired()));
        EvolutionListener::<u8>::on_event(&stop, &EvolutionEvent::End);

        let handle = bound(&stop.trigger);
        EvolutionListener::<u8>::on_event(&stop, &EvolutionEvent::Begin);
        assert!(wait_for(|| stop.trigger.has_fired()));
        assert!(handle.is_stop_requested());
        EvolutionListener::<u8>::on_event(&stop, &EvolutionEvent::End);
    }
}
