use crate::bus::Bus;
use crate::error::ScheduleError;
use core::fmt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_CYCLE: u32 = 1;
pub const DEFAULT_SHIFT: u32 = 0;

/// Stable identity of a registered plugin callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PluginId(usize);

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A processing step executed by the scheduler.
pub trait Plugin<'cfg> {
    fn name(&self) -> &str;
    fn run(&mut self, ctx: &mut PluginContext<'_, 'cfg>);
}

struct FnPlugin<F> {
    name: String,
    func: F,
}

impl<'cfg, F> Plugin<'cfg> for FnPlugin<F>
where
    F: FnMut(&mut PluginContext<'_, 'cfg>),
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, ctx: &mut PluginContext<'_, 'cfg>) {
        (self.func)(ctx);
    }
}

/// What a plugin can reach while it runs.
pub struct PluginContext<'a, 'cfg> {
    pub bus: &'a mut Bus<'cfg>,
    /// The live plugin list. Appends and suspend/resume take effect within the
    /// current tick.
    pub scheduler: &'a mut Scheduler<'cfg>,
    id: PluginId,
    index: usize,
    host_termination: bool,
}

impl<'a, 'cfg> PluginContext<'a, 'cfg> {
    pub(crate) fn new(
        bus: &'a mut Bus<'cfg>,
        scheduler: &'a mut Scheduler<'cfg>,
        id: PluginId,
        index: usize,
        host_termination: bool,
    ) -> Self {
        Self {
            bus,
            scheduler,
            id,
            index,
            host_termination,
        }
    }

    pub fn id(&self) -> PluginId {
        self.id
    }

    /// Position of the running entry when it was invoked.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether shutdown was initiated by the host rather than a plugin.
    pub fn host_termination(&self) -> bool {
        self.host_termination
    }

    pub fn request_termination(&mut self) {
        self.bus.request_termination();
    }
}

/// One position in the execution list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginEntry {
    pub plugin: PluginId,
    pub cycle: u32,
    pub shift: u32,
    /// Ticks this entry has been visited while active.
    pub tick: u64,
    pub active: bool,
}

impl PluginEntry {
    fn new(plugin: PluginId, cycle: u32, shift: u32) -> Self {
        Self {
            plugin,
            cycle,
            shift,
            tick: 0,
            active: true,
        }
    }

    pub fn is_due(&self) -> bool {
        self.tick % u64::from(self.cycle) == u64::from(self.shift)
    }

    /// Advances the tick counter and reports whether the entry fires now.
    ///
    /// Suspended entries keep their tick. `forced` visits fire regardless of
    /// suspension and phase.
    pub(crate) fn visit(&mut self, forced: bool) -> bool {
        if !forced && !self.active {
            return false;
        }
        let due = forced || self.is_due();
        self.tick += 1;
        due
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub invocations: u64,
    pub skipped: u64,
}

struct Slot<'cfg> {
    name: String,
    /// Empty while the plugin is running.
    plugin: Option<Box<dyn Plugin<'cfg> + 'cfg>>,
}

fn validate(cycle: u32, shift: u32) -> Result<(), ScheduleError> {
    if cycle == 0 || shift >= cycle {
        return Err(ScheduleError::InvalidSchedule { cycle, shift });
    }
    Ok(())
}

/// Ordered plugin execution list.
///
/// Entries refer to registered plugins by [`PluginId`]; one plugin may occupy
/// many entries. Position decides execution order within a tick.
pub struct Scheduler<'cfg> {
    slots: Vec<Slot<'cfg>>,
    pub(crate) entries: Vec<PluginEntry>,
    pub(crate) current_index: Option<usize>,
    next_index: usize,
    pub(crate) exit_index: Option<usize>,
    pub(crate) stats: SchedulerStats,
}

impl<'cfg> Scheduler<'cfg> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            entries: Vec::new(),
            current_index: None,
            next_index: 0,
            exit_index: None,
            stats: SchedulerStats::default(),
        }
    }

    pub fn register<P>(&mut self, plugin: P) -> PluginId
    where
        P: Plugin<'cfg> + 'cfg,
    {
        let id = PluginId(self.slots.len());
        let name = plugin.name().to_string();
        debug!(plugin = %id, name = %name, "plugin registered");
        self.slots.push(Slot {
            name,
            plugin: Some(Box::new(plugin)),
        });
        id
    }

    /// Registers a closure as a plugin.
    pub fn register_plugin<F>(&mut self, name: impl Into<String>, func: F) -> PluginId
    where
        F: FnMut(&mut PluginContext<'_, 'cfg>) + 'cfg,
    {
        self.register(FnPlugin {
            name: name.into(),
            func,
        })
    }

    pub fn plugin_name(&self, id: PluginId) -> Option<&str> {
        self.slots.get(id.0).map(|slot| slot.name.as_str())
    }

    fn check_registered(&self, id: PluginId) -> Result<(), ScheduleError> {
        if id.0 < self.slots.len() {
            Ok(())
        } else {
            warn!(plugin = %id, "unknown plugin");
            Err(ScheduleError::UnknownPlugin(id))
        }
    }

    /// Appends an entry firing every tick.
    pub fn add_plugin(&mut self, id: PluginId) -> Result<(), ScheduleError> {
        self.schedule_plugin(id, DEFAULT_CYCLE, DEFAULT_SHIFT)
    }

    /// Appends an entry firing on ticks where `tick % cycle == shift`.
    pub fn schedule_plugin(&mut self, id: PluginId, cycle: u32, shift: u32) -> Result<(), ScheduleError> {
        self.check_registered(id)?;
        validate(cycle, shift)?;
        self.entries.push(PluginEntry::new(id, cycle, shift));
        debug!(plugin = %id, cycle, shift, index = self.entries.len() - 1, "plugin scheduled");
        Ok(())
    }

    /// Removes every entry referring to `id`.
    pub fn remove_plugin(&mut self, id: PluginId) -> Result<(), ScheduleError> {
        self.check_registered(id)?;
        let mut removed = 0;
        for pos in (0..self.entries.len()).rev() {
            if self.entries[pos].plugin == id {
                self.remove_at(pos);
                removed += 1;
            }
        }
        if removed == 0 {
            return Err(ScheduleError::NoMatchingEntry(id));
        }
        debug!(plugin = %id, removed, "plugin removed");
        Ok(())
    }

    fn remove_at(&mut self, pos: usize) {
        self.entries.remove(pos);
        if pos < self.next_index {
            self.next_index -= 1;
        }
        let shift_down = |index: Option<usize>| match index {
            Some(i) if i == pos => None,
            Some(i) if i > pos => Some(i - 1),
            other => other,
        };
        self.current_index = shift_down(self.current_index);
        self.exit_index = shift_down(self.exit_index);
    }

    fn update_matching<F>(&mut self, id: PluginId, mut update: F) -> Result<usize, ScheduleError>
    where
        F: FnMut(&mut PluginEntry),
    {
        self.check_registered(id)?;
        let mut matched = 0;
        for entry in self.entries.iter_mut().filter(|entry| entry.plugin == id) {
            update(entry);
            matched += 1;
        }
        if matched == 0 {
            return Err(ScheduleError::NoMatchingEntry(id));
        }
        Ok(matched)
    }

    /// Puts `new` in place of `old` in every matching entry, keeping each
    /// entry's schedule and tick.
    pub fn replace_plugin(&mut self, old: PluginId, new: PluginId) -> Result<(), ScheduleError> {
        self.check_registered(new)?;
        let replaced = self.update_matching(old, |entry| entry.plugin = new)?;
        debug!(old = %old, new = %new, replaced, "plugin replaced");
        Ok(())
    }

    /// Sets a new cycle and shift on every matching entry and restarts its tick.
    pub fn reschedule_plugin(&mut self, id: PluginId, cycle: u32, shift: u32) -> Result<(), ScheduleError> {
        validate(cycle, shift)?;
        let updated = self.update_matching(id, |entry| {
            entry.cycle = cycle;
            entry.shift = shift;
            entry.tick = 0;
        })?;
        debug!(plugin = %id, cycle, shift, updated, "plugin rescheduled");
        Ok(())
    }

    pub fn suspend_plugin(&mut self, id: PluginId) -> Result<(), ScheduleError> {
        let updated = self.update_matching(id, |entry| entry.active = false)?;
        debug!(plugin = %id, updated, "plugin suspended");
        Ok(())
    }

    pub fn resume_plugin(&mut self, id: PluginId) -> Result<(), ScheduleError> {
        let updated = self.update_matching(id, |entry| entry.active = true)?;
        debug!(plugin = %id, updated, "plugin resumed");
        Ok(())
    }

    pub fn entries(&self) -> &[PluginEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry being visited by the running pass, if any.
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Entry that first requested termination and is owed one more pass.
    pub fn exit_index(&self) -> Option<usize> {
        self.exit_index
    }

    pub fn get_stats(&self) -> &SchedulerStats {
        &self.stats
    }

    pub(crate) fn begin_pass(&mut self) {
        self.next_index = 0;
        self.current_index = None;
    }

    /// Moves to the next entry. Re-reads the list length each time so entries
    /// appended during the pass are visited.
    pub(crate) fn advance(&mut self) -> Option<usize> {
        if self.next_index >= self.entries.len() {
            self.current_index = None;
            return None;
        }
        let index = self.next_index;
        self.next_index += 1;
        self.current_index = Some(index);
        Some(index)
    }

    pub(crate) fn take_plugin(&mut self, id: PluginId) -> Option<Box<dyn Plugin<'cfg> + 'cfg>> {
        self.slots.get_mut(id.0).and_then(|slot| slot.plugin.take())
    }

    pub(crate) fn restore_plugin(&mut self, id: PluginId, plugin: Box<dyn Plugin<'cfg> + 'cfg>) {
        if let Some(slot) = self.slots.get_mut(id.0) {
            slot.plugin = Some(plugin);
        }
    }

    /// Drops every entry and every registered plugin. Statistics survive.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.slots.clear();
        self.current_index = None;
        self.next_index = 0;
        self.exit_index = None;
    }
}

impl Default for Scheduler<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scheduler<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.slots.iter().map(|slot| slot.name.as_str()).collect();
        f.debug_struct("Scheduler")
            .field("plugins", &names)
            .field("entries", &self.entries)
            .field("current_index", &self.current_index)
            .field("exit_index", &self.exit_index)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop<'cfg>(scheduler: &mut Scheduler<'cfg>, name: &str) -> PluginId {
        scheduler.register_plugin(name, |_ctx| {})
    }

    #[test]
    fn test_scheduler_creation() {
        let scheduler = Scheduler::new();
        assert!(scheduler.is_empty());
        assert_eq!(scheduler.current_index(), None);
        assert_eq!(scheduler.exit_index(), None);
        assert_eq!(scheduler.get_stats().ticks, 0);
    }

    #[test]
    fn test_entry_fires_on_cycle_and_shift() {
        let mut entry = PluginEntry::new(PluginId(0), 3, 1);
        let fired: Vec<bool> = (0..7).map(|_| entry.visit(false)).collect();
        assert_eq!(fired, vec![false, true, false, false, true, false, false]);
        assert_eq!(entry.tick, 7);
    }

    #[test]
    fn test_suspended_entry_keeps_tick() {
        let mut entry = PluginEntry::new(PluginId(0), 2, 0);
        assert!(entry.visit(false));
        entry.active = false;
        assert!(!entry.visit(false));
        assert!(!entry.visit(false));
        assert_eq!(entry.tick, 1);
        entry.active = true;
        assert!(!entry.visit(false));
        assert!(entry.visit(false));
    }

    #[test]
    fn test_forced_visit_ignores_phase_and_suspension() {
        let mut entry = PluginEntry::new(PluginId(0), 5, 4);
        entry.active = false;
        assert!(entry.visit(true));
    }

    #[test]
    fn test_schedule_validation() {
        let mut scheduler = Scheduler::new();
        let id = noop(&mut scheduler, "a");
        assert_eq!(
            scheduler.schedule_plugin(id, 0, 0),
            Err(ScheduleError::InvalidSchedule { cycle: 0, shift: 0 })
        );
        assert_eq!(
            scheduler.schedule_plugin(id, 3, 3),
            Err(ScheduleError::InvalidSchedule { cycle: 3, shift: 3 })
        );
        assert!(scheduler.schedule_plugin(id, 3, 2).is_ok());
        assert_eq!(scheduler.entries()[0].cycle, 3);
    }

    #[test]
    fn test_unknown_and_unlisted_plugins() {
        let mut scheduler = Scheduler::new();
        let listed = noop(&mut scheduler, "listed");
        let unlisted = noop(&mut scheduler, "unlisted");
        scheduler.add_plugin(listed).unwrap();

        let ghost = PluginId(99);
        assert_eq!(scheduler.add_plugin(ghost), Err(ScheduleError::UnknownPlugin(ghost)));
        assert_eq!(scheduler.remove_plugin(ghost), Err(ScheduleError::UnknownPlugin(ghost)));
        assert_eq!(scheduler.suspend_plugin(unlisted), Err(ScheduleError::NoMatchingEntry(unlisted)));
        assert_eq!(scheduler.replace_plugin(listed, ghost), Err(ScheduleError::UnknownPlugin(ghost)));
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_remove_shifts_pass_indices() {
        let mut scheduler = Scheduler::new();
        let a = noop(&mut scheduler, "a");
        let b = noop(&mut scheduler, "b");
        let c = noop(&mut scheduler, "c");
        for id in [a, b, c] {
            scheduler.add_plugin(id).unwrap();
        }

        scheduler.begin_pass();
        scheduler.advance();
        scheduler.advance();
        scheduler.exit_index = Some(2);
        assert_eq!(scheduler.current_index(), Some(1));

        scheduler.remove_plugin(a).unwrap();
        assert_eq!(scheduler.current_index(), Some(0));
        assert_eq!(scheduler.exit_index(), Some(1));
        assert_eq!(scheduler.advance(), Some(1));
        assert_eq!(scheduler.entries()[1].plugin, c);

        scheduler.remove_plugin(c).unwrap();
        assert_eq!(scheduler.exit_index(), None);
        assert_eq!(scheduler.advance(), None);
    }

    #[test]
    fn test_plugin_names() {
        let mut scheduler = Scheduler::new();
        let id = noop(&mut scheduler, "imu-mechanization");
        assert_eq!(scheduler.plugin_name(id), Some("imu-mechanization"));
        assert_eq!(id.to_string(), "#0");
        let next = noop(&mut scheduler, "gnss-spp");
        assert_eq!(next.to_string(), "#1");
        assert_eq!(scheduler.plugin_name(next), Some("gnss-spp"));
    }
}
