//! Bus lifecycle: `init`, repeated `step`, then teardown either through the
//! plugin-driven termination protocol or an explicit `terminate`.

use crate::bus::Bus;
use crate::error::{CoreError, ScheduleError};
use crate::scheduler::{Plugin, PluginContext, PluginEntry, PluginId, Scheduler, SchedulerStats};
use tracing::{debug, info, warn};

/// Owner of the bus and the plugin list.
///
/// Single-threaded: plugins run one at a time, in list order, with exclusive
/// access to the bus for the duration of their call.
#[derive(Debug, Default)]
pub struct Core<'cfg> {
    bus: Option<Bus<'cfg>>,
    scheduler: Scheduler<'cfg>,
    host_termination: bool,
}

fn invoke<'cfg>(bus: &mut Bus<'cfg>, scheduler: &mut Scheduler<'cfg>, index: usize, host_termination: bool) {
    let id = scheduler.entries[index].plugin;
    let Some(mut plugin) = scheduler.take_plugin(id) else {
        warn!(plugin = %id, index, "plugin callable unavailable, skipping");
        return;
    };
    scheduler.stats.invocations += 1;
    {
        let mut ctx = PluginContext::new(bus, scheduler, id, index, host_termination);
        plugin.run(&mut ctx);
    }
    scheduler.restore_plugin(id, plugin);
}

impl<'cfg> Core<'cfg> {
    pub fn new() -> Self {
        Self {
            bus: None,
            scheduler: Scheduler::new(),
            host_termination: false,
        }
    }

    /// Builds the bus from `config`. The buffer must outlive the core.
    pub fn init(&mut self, config: &'cfg str) -> Result<(), CoreError> {
        if self.bus.is_some() {
            return Err(CoreError::AlreadyInitialized);
        }

        let bus = Bus::from_config(config);
        info!(
            subsystems = ?bus.present_subsystems(),
            plugins = self.scheduler.len(),
            "bus initialized"
        );

        self.bus = Some(bus);
        self.host_termination = false;
        self.scheduler.exit_index = None;
        Ok(())
    }

    /// Runs one tick over the plugin list.
    ///
    /// Returns whether the host should call `step` again.
    pub fn step(&mut self) -> bool {
        let Some(bus) = self.bus.as_mut() else {
            warn!("step called without an initialized bus");
            return false;
        };
        let scheduler = &mut self.scheduler;

        scheduler.begin_pass();
        while let Some(index) = scheduler.advance() {
            let revisit = scheduler.exit_index == Some(index);
            if !scheduler.entries[index].visit(revisit || bus.is_terminating()) {
                scheduler.stats.skipped += 1;
                continue;
            }

            invoke(bus, scheduler, index, self.host_termination);

            if revisit {
                info!(index, "terminating plugin revisited");
                scheduler.stats.ticks += 1;
                self.teardown();
                return false;
            }

            if bus.is_terminating() && scheduler.exit_index.is_none() {
                scheduler.exit_index = scheduler.current_index;
                if let Some(exit) = scheduler.exit_index {
                    info!(index = exit, mode = bus.mode, "termination requested");
                }
            }
        }
        scheduler.stats.ticks += 1;

        if bus.mode == 0 {
            bus.mode = 1;
        }

        if bus.is_terminating() && scheduler.exit_index.is_none() {
            // Nobody left to acknowledge the request.
            info!("termination requested with no plugin to revisit");
            self.teardown();
            return false;
        }

        debug!(mode = bus.mode, exit_index = ?scheduler.exit_index, "tick complete");
        bus.mode >= 0 || scheduler.exit_index.is_some()
    }

    /// Host-initiated shutdown: one unconditional pass over every entry with
    /// `mode = -1`, then teardown.
    pub fn terminate(&mut self) -> Result<(), CoreError> {
        let Some(bus) = self.bus.as_mut() else {
            warn!("terminate called without an initialized bus");
            return Err(CoreError::NotInitialized);
        };
        self.host_termination = true;
        bus.mode = -1;
        info!(plugins = self.scheduler.len(), "host requested termination");

        let scheduler = &mut self.scheduler;
        scheduler.begin_pass();
        while let Some(index) = scheduler.advance() {
            invoke(bus, scheduler, index, true);
        }
        scheduler.stats.ticks += 1;

        self.teardown();
        Ok(())
    }

    /// Releases the bus and the plugin list.
    ///
    /// Records own their buffers, so dropping the bus frees constellations
    /// before the GNSS record and every record before the bus itself.
    fn teardown(&mut self) {
        if let Some(bus) = self.bus.take() {
            info!(subsystems = ?bus.present_subsystems(), "releasing bus");
        }
        self.scheduler.clear();
        debug!("plugin list released");
    }

    pub fn is_initialized(&self) -> bool {
        self.bus.is_some()
    }

    pub fn bus(&self) -> Option<&Bus<'cfg>> {
        self.bus.as_ref()
    }

    pub fn bus_mut(&mut self) -> Option<&mut Bus<'cfg>> {
        self.bus.as_mut()
    }

    /// Whether the last shutdown came from [`Core::terminate`].
    pub fn host_termination(&self) -> bool {
        self.host_termination
    }

    pub fn scheduler(&self) -> &Scheduler<'cfg> {
        &self.scheduler
    }

    pub fn register<P>(&mut self, plugin: P) -> PluginId
    where
        P: Plugin<'cfg> + 'cfg,
    {
        self.scheduler.register(plugin)
    }

    pub fn register_plugin<F>(&mut self, name: impl Into<String>, func: F) -> PluginId
    where
        F: FnMut(&mut PluginContext<'_, 'cfg>) + 'cfg,
    {
        self.scheduler.register_plugin(name, func)
    }

    pub fn add_plugin(&mut self, id: PluginId) -> Result<(), ScheduleError> {
        self.scheduler.add_plugin(id)
    }

    pub fn schedule_plugin(&mut self, id: PluginId, cycle: u32, shift: u32) -> Result<(), ScheduleError> {
        self.scheduler.schedule_plugin(id, cycle, shift)
    }

    pub fn remove_plugin(&mut self, id: PluginId) -> Result<(), ScheduleError> {
        self.scheduler.remove_plugin(id)
    }

    pub fn replace_plugin(&mut self, old: PluginId, new: PluginId) -> Result<(), ScheduleError> {
        self.scheduler.replace_plugin(old, new)
    }

    pub fn reschedule_plugin(&mut self, id: PluginId, cycle: u32, shift: u32) -> Result<(), ScheduleError> {
        self.scheduler.reschedule_plugin(id, cycle, shift)
    }

    pub fn suspend_plugin(&mut self, id: PluginId) -> Result<(), ScheduleError> {
        self.scheduler.suspend_plugin(id)
    }

    pub fn resume_plugin(&mut self, id: PluginId) -> Result<(), ScheduleError> {
        self.scheduler.resume_plugin(id)
    }

    pub fn entries(&self) -> &[PluginEntry] {
        self.scheduler.entries()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.scheduler.current_index()
    }

    pub fn exit_index(&self) -> Option<usize> {
        self.scheduler.exit_index()
    }

    pub fn get_stats(&self) -> &SchedulerStats {
        self.scheduler.get_stats()
    }
}
