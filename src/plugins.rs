//! General-purpose plugins used by hosts and tests.

use crate::config::{token_value, ConfigSpan};
use crate::scheduler::{Plugin, PluginContext};
use tracing::info;

pub const DEFAULT_DT: f64 = 0.01;

/// Advances bus time by `dt` each time it fires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clock {
    pub dt: f64,
}

impl Clock {
    pub fn new(dt: f64) -> Self {
        Self { dt }
    }

    /// Reads `dt: <seconds>` from `config`, falling back to [`DEFAULT_DT`].
    pub fn from_config(config: Option<ConfigSpan<'_>>) -> Self {
        let dt = config
            .and_then(|span| token_value("dt", span.as_str()))
            .and_then(|value| value.parse().ok())
            .filter(|dt: &f64| dt.is_finite() && *dt > 0.0)
            .unwrap_or(DEFAULT_DT);
        Self { dt }
    }
}

impl<'cfg> Plugin<'cfg> for Clock {
    fn name(&self) -> &str {
        "clock"
    }

    fn run(&mut self, ctx: &mut PluginContext<'_, 'cfg>) {
        if !ctx.bus.is_terminating() {
            ctx.bus.t += self.dt;
        }
    }
}

/// Requests termination after firing `ticks` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopAfter {
    pub ticks: u64,
    fired: u64,
}

impl StopAfter {
    pub fn new(ticks: u64) -> Self {
        Self { ticks, fired: 0 }
    }

    /// Reads `ticks: <count>` from `config`.
    pub fn from_config(config: Option<ConfigSpan<'_>>) -> Option<Self> {
        config
            .and_then(|span| token_value("ticks", span.as_str()))
            .and_then(|value| value.parse().ok())
            .map(Self::new)
    }

    pub fn fired(&self) -> u64 {
        self.fired
    }
}

impl<'cfg> Plugin<'cfg> for StopAfter {
    fn name(&self) -> &str {
        "stop-after"
    }

    fn run(&mut self, ctx: &mut PluginContext<'_, 'cfg>) {
        self.fired += 1;
        if self.fired >= self.ticks && !ctx.bus.is_terminating() {
            info!(ticks = self.fired, t = ctx.bus.t, "tick limit reached");
            ctx.request_termination();
        }
    }
}
