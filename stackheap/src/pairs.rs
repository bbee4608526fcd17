//! Measurement pairs: one `stack` and one `heap` sub-benchmark per size class.
//!
//! Every invocation of a sub-benchmark spawns its own execution unit with a
//! stack sized for the class, runs the timed construct-then-mutate loop
//! inside it, and returns once the unit has signalled completion.

use crate::size_class::SizeClass;
use crate::values::{Huge, Large, Medium, Small, Value};
use stackheap_core::{
    Bencher, BenchmarkDef, BenchmarkResult, ExecutionUnit, RunError, Strategy, run_benchmark_loop,
};
use std::hint::black_box;

/// Runner function signature shared with the registry
pub type RunnerFn = fn(&mut Bencher) -> Result<(), RunError>;

/// One loop iteration of the stack arm; returns the counter after mutation
#[inline(always)]
pub fn stack_cycle<V: Value>() -> u8 {
    let mut v = V::create();
    v.increment();
    black_box(&v);
    v.counter()
}

/// One loop iteration of the heap arm; returns the counter after mutation
#[inline(always)]
pub fn heap_cycle<V: Value>() -> u8 {
    let mut v = V::boxed();
    v.increment();
    black_box(&v);
    v.counter()
}

/// Construct with `strategy`, mutate once, return the counter
pub fn cycle<V: Value>(strategy: Strategy) -> u8 {
    match strategy {
        Strategy::ByValue => stack_cycle::<V>(),
        Strategy::ByReference => heap_cycle::<V>(),
    }
}

/// Run the timed loop for `V` under `strategy` on a fresh execution unit.
pub fn measure<V: Value>(b: &mut Bencher, strategy: Strategy) -> Result<(), RunError> {
    let class = V::SIZE_CLASS;
    let unit = ExecutionUnit::new(format!("{}/{}", class.label(), strategy.label()))
        .stack_size(class.unit_stack_size())
        .pin_to(b.cpu_affinity());

    // Branch once, outside the loop
    unit.run(|| match strategy {
        Strategy::ByValue => b.iter(stack_cycle::<V>),
        Strategy::ByReference => b.iter(heap_cycle::<V>),
    })
}

fn stack_arm<V: Value>(b: &mut Bencher) -> Result<(), RunError> {
    measure::<V>(b, Strategy::ByValue)
}

fn heap_arm<V: Value>(b: &mut Bencher) -> Result<(), RunError> {
    measure::<V>(b, Strategy::ByReference)
}

/// Runner function for one arm of one size class
pub fn runner_for(class: SizeClass, strategy: Strategy) -> RunnerFn {
    match (class, strategy) {
        (SizeClass::Small, Strategy::ByValue) => stack_arm::<Small>,
        (SizeClass::Small, Strategy::ByReference) => heap_arm::<Small>,
        (SizeClass::Medium, Strategy::ByValue) => stack_arm::<Medium>,
        (SizeClass::Medium, Strategy::ByReference) => heap_arm::<Medium>,
        (SizeClass::Large, Strategy::ByValue) => stack_arm::<Large>,
        (SizeClass::Large, Strategy::ByReference) => heap_arm::<Large>,
        (SizeClass::Huge, Strategy::ByValue) => stack_arm::<Huge>,
        (SizeClass::Huge, Strategy::ByReference) => heap_arm::<Huge>,
    }
}

macro_rules! register_pair {
    ($value:ty, $group:literal) => {
        inventory::submit! {
            BenchmarkDef {
                id: concat!($group, "/stack"),
                group: $group,
                strategy: Strategy::ByValue,
                width_bytes: <$value as Value>::WIDTH,
                regime: <$value as Value>::SIZE_CLASS.regime(),
                tags: &["stack"],
                runner_fn: stack_arm::<$value>,
                file: file!(),
                line: line!(),
            }
        }
        inventory::submit! {
            BenchmarkDef {
                id: concat!($group, "/heap"),
                group: $group,
                strategy: Strategy::ByReference,
                width_bytes: <$value as Value>::WIDTH,
                regime: <$value as Value>::SIZE_CLASS.regime(),
                tags: &["heap"],
                runner_fn: heap_arm::<$value>,
                file: file!(),
                line: line!(),
            }
        }
    };
}

register_pair!(Small, "small");
register_pair!(Medium, "medium");
register_pair!(Large, "large");
register_pair!(Huge, "huge");

/// Keeps this module's registrations in the final binary; `run()` calls it.
#[doc(hidden)]
#[inline(never)]
pub fn link_registry() -> RunnerFn {
    black_box(stack_arm::<Small> as RunnerFn)
}

/// Lifecycle of a sub-benchmark invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Never invoked, or the last invocation could not spawn its unit
    NotStarted,
    /// Execution unit spawned, timed loop in progress
    Running,
    /// Completion signal received
    Completed,
}

/// One arm of a measurement pair
#[derive(Debug, Clone)]
pub struct SubBenchmark {
    class: SizeClass,
    strategy: Strategy,
    state: RunState,
    invocations: u64,
}

impl SubBenchmark {
    /// New, never-invoked sub-benchmark
    pub fn new(class: SizeClass, strategy: Strategy) -> Self {
        Self {
            class,
            strategy,
            state: RunState::NotStarted,
            invocations: 0,
        }
    }

    /// `<class>/<strategy>`, matching the registry id
    pub fn id(&self) -> String {
        format!("{}/{}", self.class.label(), self.strategy.label())
    }

    /// Size class under measurement
    pub fn class(&self) -> SizeClass {
        self.class
    }

    /// Construction strategy under measurement
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Current lifecycle state
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Completed invocations so far
    pub fn invocations(&self) -> u64 {
        self.invocations
    }

    /// Run the timed loop once on a fresh execution unit.
    ///
    /// May be called any number of times; each call spawns a new unit.
    pub fn invoke(&mut self, bencher: &mut Bencher) -> Result<(), RunError> {
        self.state = RunState::Running;
        let outcome = runner_for(self.class, self.strategy)(bencher);
        self.state = match outcome {
            Ok(()) => {
                self.invocations += 1;
                RunState::Completed
            }
            Err(_) => RunState::NotStarted,
        };
        outcome
    }

    /// Invoke with a fresh bencher and collect its result
    pub fn run(&mut self, bencher: Bencher) -> Result<BenchmarkResult, RunError> {
        run_benchmark_loop(bencher, |b| self.invoke(b))
    }
}

/// A size class with its two sub-benchmarks
#[derive(Debug, Clone)]
pub struct MeasurementPair {
    /// Size class both arms measure
    pub class: SizeClass,
    /// By-value arm
    pub stack: SubBenchmark,
    /// By-reference arm
    pub heap: SubBenchmark,
}

impl MeasurementPair {
    /// Pair for one size class, both arms not started
    pub fn new(class: SizeClass) -> Self {
        Self {
            class,
            stack: SubBenchmark::new(class, Strategy::ByValue),
            heap: SubBenchmark::new(class, Strategy::ByReference),
        }
    }

    /// All four pairs, narrowest first
    pub fn all() -> Vec<MeasurementPair> {
        SizeClass::ALL.into_iter().map(MeasurementPair::new).collect()
    }

    /// The arm for `strategy`
    pub fn arm_mut(&mut self, strategy: Strategy) -> &mut SubBenchmark {
        match strategy {
            Strategy::ByValue => &mut self.stack,
            Strategy::ByReference => &mut self.heap,
        }
    }

    /// Run the stack arm then the heap arm, each with a fresh bencher
    pub fn run(
        &mut self,
        mut bencher: impl FnMut() -> Bencher,
    ) -> Result<(BenchmarkResult, BenchmarkResult), RunError> {
        let stack = self.stack.run(bencher())?;
        let heap = self.heap.run(bencher())?;
        Ok((stack, heap))
    }
}
