use navbus::*;
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<(u64, &'static str)>>>;

/// Registers a plugin recording `(tick, name)` each time it runs.
fn recorder(core: &mut Core<'_>, log: &Log, name: &'static str) -> PluginId {
    let log = Rc::clone(log);
    core.register_plugin(name, move |ctx| {
        let tick = ctx.scheduler.get_stats().ticks;
        log.borrow_mut().push((tick, name));
    })
}

fn ticks_of(log: &Log, name: &str) -> Vec<u64> {
    log.borrow().iter().filter(|(_, n)| *n == name).map(|(t, _)| *t).collect()
}

fn run(core: &mut Core<'_>, ticks: usize) {
    for _ in 0..ticks {
        assert!(core.step());
    }
}

#[test]
fn test_periodic_entry_fires_on_cycle_and_shift() {
    let log = Log::default();
    let mut core = Core::new();
    let every = recorder(&mut core, &log, "every");
    let third = recorder(&mut core, &log, "third");
    core.add_plugin(every).unwrap();
    core.schedule_plugin(third, 3, 1).unwrap();
    core.init("").unwrap();

    run(&mut core, 21);

    assert_eq!(ticks_of(&log, "every"), (0..21).collect::<Vec<_>>());
    assert_eq!(ticks_of(&log, "third"), vec![1, 4, 7, 10, 13, 16, 19]);
    assert_eq!(core.get_stats().ticks, 21);
    assert_eq!(core.get_stats().invocations, 28);
    assert_eq!(core.get_stats().skipped, 14);
}

#[test]
fn test_plugin_order_follows_list_position() {
    let log = Log::default();
    let mut core = Core::new();
    let a = recorder(&mut core, &log, "a");
    let b = recorder(&mut core, &log, "b");
    core.add_plugin(b).unwrap();
    core.add_plugin(a).unwrap();
    core.add_plugin(b).unwrap();
    core.init("").unwrap();

    run(&mut core, 1);
    assert_eq!(*log.borrow(), vec![(0, "b"), (0, "a"), (0, "b")]);
}

#[test]
fn test_suspend_keeps_tick_until_resumed() {
    let log = Log::default();
    let mut core = Core::new();
    let p = recorder(&mut core, &log, "p");
    core.schedule_plugin(p, 2, 0).unwrap();
    core.init("").unwrap();

    run(&mut core, 1);
    core.suspend_plugin(p).unwrap();
    run(&mut core, 2);
    assert_eq!(core.entries()[0].tick, 1);
    assert!(!core.entries()[0].active);

    core.resume_plugin(p).unwrap();
    run(&mut core, 3);
    assert_eq!(ticks_of(&log, "p"), vec![0, 4]);
}

#[test]
fn test_reschedule_restarts_tick() {
    let log = Log::default();
    let mut core = Core::new();
    let p = recorder(&mut core, &log, "p");
    core.add_plugin(p).unwrap();
    core.init("").unwrap();

    run(&mut core, 2);
    core.reschedule_plugin(p, 3, 0).unwrap();
    assert_eq!(core.entries()[0].tick, 0);
    run(&mut core, 4);

    assert_eq!(ticks_of(&log, "p"), vec![0, 1, 2, 5]);
    assert_eq!(
        core.reschedule_plugin(p, 2, 2),
        Err(ScheduleError::InvalidSchedule { cycle: 2, shift: 2 })
    );
}

#[test]
fn test_replace_and_remove_touch_every_entry() {
    let log = Log::default();
    let mut core = Core::new();
    let a = recorder(&mut core, &log, "a");
    let b = recorder(&mut core, &log, "b");
    let c = recorder(&mut core, &log, "c");
    core.add_plugin(a).unwrap();
    core.add_plugin(b).unwrap();
    core.schedule_plugin(a, 2, 1).unwrap();
    core.add_plugin(a).unwrap();

    core.replace_plugin(a, c).unwrap();
    let plugins: Vec<_> = core.entries().iter().map(|e| e.plugin).collect();
    assert_eq!(plugins, vec![c, b, c, c]);
    assert_eq!((core.entries()[2].cycle, core.entries()[2].shift), (2, 1));
    assert_eq!(core.remove_plugin(a), Err(ScheduleError::NoMatchingEntry(a)));

    core.remove_plugin(c).unwrap();
    assert_eq!(core.entries().len(), 1);
    assert_eq!(core.entries()[0].plugin, b);

    core.init("").unwrap();
    run(&mut core, 1);
    assert_eq!(*log.borrow(), vec![(0, "b")]);
}

#[test]
fn test_appended_entry_runs_in_same_tick() {
    let log = Log::default();
    let mut core = Core::new();
    let late = recorder(&mut core, &log, "late");
    let spawner = {
        let log = Rc::clone(&log);
        let mut spawned = false;
        core.register_plugin("spawner", move |ctx| {
            log.borrow_mut().push((ctx.scheduler.get_stats().ticks, "spawner"));
            if !spawned {
                ctx.scheduler.add_plugin(late).unwrap();
                spawned = true;
            }
        })
    };
    core.add_plugin(spawner).unwrap();
    core.init("").unwrap();

    run(&mut core, 2);
    assert_eq!(
        *log.borrow(),
        vec![(0, "spawner"), (0, "late"), (1, "spawner"), (1, "late")]
    );
}

#[test]
fn test_plugin_removing_itself_does_not_skip_next_entry() {
    let log = Log::default();
    let mut core = Core::new();
    let once = {
        let log = Rc::clone(&log);
        core.register_plugin("once", move |ctx| {
            log.borrow_mut().push((ctx.scheduler.get_stats().ticks, "once"));
            let me = ctx.id();
            ctx.scheduler.remove_plugin(me).unwrap();
        })
    };
    let after = recorder(&mut core, &log, "after");
    core.add_plugin(once).unwrap();
    core.add_plugin(after).unwrap();
    core.init("").unwrap();

    run(&mut core, 2);
    assert_eq!(*log.borrow(), vec![(0, "once"), (0, "after"), (1, "after")]);
    assert_eq!(core.entries().len(), 1);
}

#[test]
fn test_plugin_rescheduling_itself_starts_fresh() {
    let log = Log::default();
    let mut core = Core::new();
    let slow = {
        let log = Rc::clone(&log);
        let mut first = true;
        core.register_plugin("slow", move |ctx| {
            log.borrow_mut().push((ctx.scheduler.get_stats().ticks, "slow"));
            if first {
                let me = ctx.id();
                ctx.scheduler.reschedule_plugin(me, 2, 1).unwrap();
                first = false;
            }
        })
    };
    core.add_plugin(slow).unwrap();
    core.init("").unwrap();

    run(&mut core, 6);
    assert_eq!(ticks_of(&log, "slow"), vec![0, 2, 4]);
}

#[test]
fn test_suspending_later_entry_applies_this_tick() {
    let log = Log::default();
    let mut core = Core::new();
    let victim = recorder(&mut core, &log, "victim");
    let gate = core.register_plugin("gate", move |ctx| {
        if ctx.scheduler.get_stats().ticks == 1 {
            ctx.scheduler.suspend_plugin(victim).unwrap();
        }
        if ctx.scheduler.get_stats().ticks == 3 {
            ctx.scheduler.resume_plugin(victim).unwrap();
        }
    });
    core.add_plugin(gate).unwrap();
    core.add_plugin(victim).unwrap();
    core.init("").unwrap();

    run(&mut core, 5);
    assert_eq!(ticks_of(&log, "victim"), vec![0, 3, 4]);
}

#[test]
fn test_scheduling_before_and_after_init() {
    let log = Log::default();
    let mut core = Core::new();
    let early = recorder(&mut core, &log, "early");
    core.add_plugin(early).unwrap();
    core.init("").unwrap();

    run(&mut core, 1);
    let late = recorder(&mut core, &log, "late");
    core.add_plugin(late).unwrap();
    run(&mut core, 1);

    assert_eq!(*log.borrow(), vec![(0, "early"), (1, "early"), (1, "late")]);
    assert_eq!(core.scheduler().plugin_name(late), Some("late"));
}
