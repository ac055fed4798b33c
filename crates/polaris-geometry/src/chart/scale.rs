//! Scales that feed ticks to radial elements.
//!
//! A scale owns an [`InvalidationState`] with no consistency states of its own:
//! it only broadcasts signals. Elements relay those signals into their own
//! dirty bits through a [`ScaleSubscription`], so a mutated scale dirties every
//! axis and grid using it before the mutating call returns.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use polaris_core::{
    ConsistencyState, ElementId, Invalidatable, InvalidationState, ListenerId, Signal,
    SignalEvent,
};

/// Signals a scale may broadcast.
const SCALE_SIGNALS: Signal = Signal::NEEDS_RECALCULATION.union(Signal::NEEDS_REAPPLICATION);

/// Upper bound on generated ticks for a linear scale.
const MAX_LINEAR_TICKS: usize = 10_000;

/// Tick values of a scale, with display names for categorical scales.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScaleTicks {
    pub values: Vec<f64>,
    /// Empty for numeric scales.
    pub names: Vec<String>,
}

impl ScaleTicks {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }
}

/// Maps data values to ratios and produces ticks.
pub trait Scale: Invalidatable {
    /// Major ticks.
    fn ticks(&self) -> ScaleTicks;

    /// Minor ticks. Scales without a minor grid return the major ticks.
    fn minor_ticks(&self) -> ScaleTicks {
        self.ticks()
    }

    /// Map a value to a ratio in `[0, 1]`.
    fn transform(&self, value: f64) -> f64;

    fn is_ordinal(&self) -> bool {
        false
    }

    fn minimum(&self) -> Option<f64> {
        None
    }

    fn maximum(&self) -> Option<f64> {
        None
    }
}

/// Shared, mutable scale. Several axes and grids may hold the same scale.
pub type ScaleHandle = Rc<RefCell<dyn Scale>>;

/// Whether two handles point at the same scale instance.
pub fn same_scale(a: &ScaleHandle, b: &ScaleHandle) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// A scale held by an element, with the relay it registered on it.
///
/// Registering needs a shared borrow of the scale. When the scale is
/// mutably borrowed at that moment the handle is still kept and
/// [`relay_to`](Self::relay_to) can be retried later.
pub struct ScaleSubscription {
    handle: ScaleHandle,
    source: ElementId,
    listener: Option<ListenerId>,
}

impl ScaleSubscription {
    /// Hold `handle` without listening to it yet.
    pub fn new(handle: ScaleHandle) -> Self {
        let source = handle
            .try_borrow()
            .map(|scale| scale.element_id())
            .unwrap_or_default();
        Self {
            handle,
            source,
            listener: None,
        }
    }

    /// Relay the scale's broadcasts into `target` through `translate`.
    ///
    /// Returns true when the relay was registered by this call, false when it
    /// already existed or the scale is borrowed.
    pub fn relay_to(&mut self, target: &InvalidationState, translate: ScaleTranslator) -> bool {
        if self.listener.is_some() {
            return false;
        }
        match self.handle.try_borrow() {
            Ok(scale) => {
                self.source = scale.element_id();
                self.listener = Some(scale.invalidation().relay_signals(target, translate));
                true
            }
            Err(_) => {
                tracing::warn!(
                    element = %target.id(),
                    "scale is mutably borrowed, relay deferred"
                );
                false
            }
        }
    }

    /// Whether the scale's broadcasts currently reach the element.
    pub fn is_relayed(&self) -> bool {
        self.listener.is_some()
    }

    pub fn handle(&self) -> &ScaleHandle {
        &self.handle
    }

    /// Id carried by events from this scale.
    pub fn source(&self) -> ElementId {
        self.source
    }

    pub fn is(&self, handle: &ScaleHandle) -> bool {
        same_scale(&self.handle, handle)
    }

    /// Stop listening and hand the scale back.
    pub fn unsubscribe(self) -> ScaleHandle {
        if let Some(listener) = self.listener {
            match self.handle.try_borrow() {
                Ok(scale) => {
                    scale.invalidation().unlisten_signals(listener);
                }
                Err(_) => {
                    // The stale relay only ends once the element is dropped.
                    tracing::warn!(scale = %self.source, "scale is borrowed, relay left behind");
                }
            }
        }
        self.handle
    }
}

impl fmt::Debug for ScaleSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScaleSubscription")
            .field("source", &self.source)
            .field("listener", &self.listener)
            .finish_non_exhaustive()
    }
}

/// Translation from scale events into the states of an element using it.
pub type ScaleTranslator = fn(&SignalEvent) -> (ConsistencyState, Signal);

/// Replace `current` with a subscription to `new`, relayed into `target`.
///
/// Returns false when `new` is the scale already held, in which case nothing
/// changes. A changed scale is always stored, even if the relay has to wait
/// for the scale to be released.
pub fn resubscribe(
    current: &mut Option<ScaleSubscription>,
    new: Option<ScaleHandle>,
    target: &InvalidationState,
    translate: ScaleTranslator,
) -> bool {
    let unchanged = match (current.as_ref(), new.as_ref()) {
        (Some(held), Some(new)) => held.is(new),
        (None, None) => true,
        _ => false,
    };
    if unchanged {
        return false;
    }
    if let Some(old) = current.take() {
        old.unsubscribe();
    }
    *current = new.map(|handle| {
        let mut subscription = ScaleSubscription::new(handle);
        subscription.relay_to(target, translate);
        subscription
    });
    true
}

/// Categorical scale: one tick per name.
#[derive(Debug)]
pub struct OrdinalScale {
    state: InvalidationState,
    names: Vec<String>,
}

impl OrdinalScale {
    pub fn new() -> Self {
        Self {
            state: InvalidationState::new(ConsistencyState::empty(), SCALE_SIGNALS),
            names: Vec::new(),
        }
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut scale = Self::new();
        scale.names = names.into_iter().map(Into::into).collect();
        scale
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Replace the categories and tell listeners to reapply the scale.
    pub fn set_names<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names != self.names {
            self.names = names;
            self.state.dispatch_signal(Signal::NEEDS_REAPPLICATION);
        }
    }

    pub fn into_handle(self) -> ScaleHandle {
        Rc::new(RefCell::new(self))
    }
}

impl Default for OrdinalScale {
    fn default() -> Self {
        Self::new()
    }
}

impl Invalidatable for OrdinalScale {
    fn invalidation(&self) -> &InvalidationState {
        &self.state
    }

    fn invalidation_mut(&mut self) -> &mut InvalidationState {
        &mut self.state
    }
}

impl Scale for OrdinalScale {
    fn ticks(&self) -> ScaleTicks {
        ScaleTicks {
            values: (0..self.names.len()).map(|i| i as f64).collect(),
            names: self.names.clone(),
        }
    }

    /// `index / count`, so the first category sits at the center.
    fn transform(&self, value: f64) -> f64 {
        if self.names.is_empty() {
            return 0.0;
        }
        (value / self.names.len() as f64).clamp(0.0, 1.0)
    }

    fn is_ordinal(&self) -> bool {
        true
    }
}

/// Numeric scale with evenly spaced major and minor ticks.
#[derive(Debug)]
pub struct LinearScale {
    state: InvalidationState,
    min: f64,
    max: f64,
    interval: f64,
    minor_interval: f64,
}

impl LinearScale {
    pub fn new(min: f64, max: f64) -> Self {
        let span = (max - min).abs();
        let interval = if span > 0.0 { span / 5.0 } else { 1.0 };
        Self {
            state: InvalidationState::new(ConsistencyState::empty(), SCALE_SIGNALS),
            min,
            max,
            interval,
            minor_interval: interval / 5.0,
        }
    }

    pub fn with_interval(mut self, interval: f64) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_minor_interval(mut self, minor_interval: f64) -> Self {
        self.minor_interval = minor_interval;
        self
    }

    pub fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    pub fn set_range(&mut self, min: f64, max: f64) {
        if self.min != min || self.max != max {
            self.min = min;
            self.max = max;
            self.state.dispatch_signal(Signal::NEEDS_REAPPLICATION);
        }
    }

    pub fn set_interval(&mut self, interval: f64) {
        if self.interval != interval {
            self.interval = interval;
            self.state.dispatch_signal(Signal::NEEDS_RECALCULATION);
        }
    }

    pub fn set_minor_interval(&mut self, minor_interval: f64) {
        if self.minor_interval != minor_interval {
            self.minor_interval = minor_interval;
            self.state.dispatch_signal(Signal::NEEDS_RECALCULATION);
        }
    }

    pub fn into_handle(self) -> ScaleHandle {
        Rc::new(RefCell::new(self))
    }

    fn ticks_with_step(&self, step: f64) -> ScaleTicks {
        let (lo, hi) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        if step <= 0.0 || !step.is_finite() || !lo.is_finite() || !hi.is_finite() {
            return ScaleTicks {
                values: vec![lo],
                names: Vec::new(),
            };
        }

        let tolerance = step * 1e-9;
        let mut values = Vec::new();
        let mut i = 0usize;
        loop {
            let value = lo + step * i as f64;
            if value > hi + tolerance || values.len() >= MAX_LINEAR_TICKS {
                break;
            }
            values.push(value.min(hi));
            i += 1;
        }
        ScaleTicks {
            values,
            names: Vec::new(),
        }
    }
}

impl Invalidatable for LinearScale {
    fn invalidation(&self) -> &InvalidationState {
        &self.state
    }

    fn invalidation_mut(&mut self) -> &mut InvalidationState {
        &mut self.state
    }
}

impl Scale for LinearScale {
    fn ticks(&self) -> ScaleTicks {
        self.ticks_with_step(self.interval)
    }

    fn minor_ticks(&self) -> ScaleTicks {
        self.ticks_with_step(self.minor_interval)
    }

    fn transform(&self, value: f64) -> f64 {
        if (self.max - self.min).abs() < f64::EPSILON {
            return 0.5;
        }
        (value - self.min) / (self.max - self.min)
    }

    fn minimum(&self) -> Option<f64> {
        Some(self.min)
    }

    fn maximum(&self) -> Option<f64> {
        Some(self.max)
    }
}
