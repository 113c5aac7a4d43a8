//! Scheduler behavior tests
//!
//! Drives small trees of probe tasks on a manual clock and checks the
//! lifecycle through the context journal and the tree itself.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use tasktree::clock::ManualClock;
use tasktree::config::{ConfigResolver, EnvSource, HookErrorPolicy, RestartScope, SchedulerConfig, TimeoutCascade};
use tasktree::diagnostics::{DiagnosticSink, MemoryDiagnostics, NodeSnapshot, TreeSnapshot};
use tasktree::error::{Result, TaskTreeError};
use tasktree::orchestrator::{Orchestrator, TickOutcome};
use tasktree::sim::SimContext;
use tasktree::task::{Hook, StatusReason, Task, TaskKind, TaskOptions, TaskStatus};

/// External switches a test flips between ticks.
#[derive(Debug, Clone, Default)]
struct Signals {
    restart: Arc<AtomicBool>,
    confirm: Arc<AtomicBool>,
    restart_polls: Arc<AtomicU32>,
}

impl Signals {
    fn request_restart(&self) {
        self.restart.store(true, Ordering::SeqCst);
    }

    fn confirm(&self) {
        self.confirm.store(true, Ordering::SeqCst);
    }

    fn restart_polls(&self) -> u32 {
        self.restart_polls.load(Ordering::SeqCst)
    }
}

/// Task that records every hook call into the journal.
#[derive(Clone)]
struct Probe {
    name: &'static str,
    kind: TaskKind,
    options: TaskOptions,
    /// `did` polls answered false before true; `None` never completes
    done_after: Option<u32>,
    polls: u32,
    signals: Signals,
    ignore: bool,
    fail_execute: bool,
    fail_complete: bool,
    loops: u32,
    children: Vec<Probe>,
}

impl Probe {
    fn leaf(name: &'static str) -> Self {
        Self {
            name,
            kind: TaskKind::Noop,
            options: TaskOptions::default(),
            done_after: Some(0),
            polls: 0,
            signals: Signals::default(),
            ignore: false,
            fail_execute: false,
            fail_complete: false,
            loops: 0,
            children: Vec::new(),
        }
    }

    fn seq(name: &'static str, children: Vec<Probe>) -> Self {
        Self {
            kind: TaskKind::Sequence,
            children,
            ..Self::leaf(name)
        }
    }

    fn of_kind(mut self, kind: TaskKind) -> Self {
        self.kind = kind;
        self
    }

    fn with_options(mut self, options: TaskOptions) -> Self {
        self.options = options;
        self
    }

    fn never_done(mut self) -> Self {
        self.done_after = None;
        self
    }

    fn done_after(mut self, polls: u32) -> Self {
        self.done_after = Some(polls);
        self
    }

    fn signals(mut self, signals: &Signals) -> Self {
        self.signals = signals.clone();
        self
    }

    fn ignored(mut self) -> Self {
        self.ignore = true;
        self
    }

    fn failing(mut self) -> Self {
        self.fail_execute = true;
        self
    }

    fn failing_on_complete(mut self) -> Self {
        self.fail_complete = true;
        self
    }

    fn looping(mut self, passes: u32) -> Self {
        self.loops = passes;
        self
    }

    fn boxed(self) -> Box<dyn Task<SimContext>> {
        Box::new(self)
    }
}

impl Task<SimContext> for Probe {
    fn kind(&self) -> TaskKind {
        self.kind
    }

    fn name(&self) -> String {
        self.name.to_string()
    }

    fn options(&self) -> TaskOptions {
        self.options
    }

    fn is_composite(&self) -> bool {
        self.kind == TaskKind::Sequence
    }

    fn build_children(&mut self, _ctx: &mut SimContext) -> eyre::Result<Vec<Box<dyn Task<SimContext>>>> {
        Ok(self.children.iter().cloned().map(Probe::boxed).collect())
    }

    fn should_ignore(&mut self, _ctx: &mut SimContext) -> eyre::Result<bool> {
        Ok(self.ignore)
    }

    fn execute(&mut self, ctx: &mut SimContext) -> eyre::Result<()> {
        ctx.record(self.name, "execute");
        if self.fail_execute {
            eyre::bail!("{} exploded", self.name);
        }
        Ok(())
    }

    fn did(&mut self, ctx: &mut SimContext) -> eyre::Result<bool> {
        ctx.record(self.name, "did");
        self.polls += 1;
        Ok(self.done_after.is_some_and(|n| self.polls > n))
    }

    fn ping(&mut self, ctx: &mut SimContext) -> eyre::Result<()> {
        ctx.record(self.name, "ping");
        Ok(())
    }

    fn should_restart(&mut self, _ctx: &mut SimContext) -> eyre::Result<bool> {
        self.signals.restart_polls.fetch_add(1, Ordering::SeqCst);
        Ok(self.signals.restart.swap(false, Ordering::SeqCst))
    }

    fn should_manually_complete(&mut self, _ctx: &mut SimContext) -> eyre::Result<bool> {
        Ok(self.signals.confirm.load(Ordering::SeqCst))
    }

    fn should_restart_after_all_children_complete(&mut self, _ctx: &mut SimContext) -> eyre::Result<bool> {
        if self.loops > 0 {
            self.loops -= 1;
            return Ok(true);
        }
        Ok(false)
    }

    fn on_before_start(&mut self, ctx: &mut SimContext) -> eyre::Result<()> {
        self.polls = 0;
        ctx.record(self.name, "before_start");
        Ok(())
    }

    fn on_before_restart(&mut self, ctx: &mut SimContext) -> eyre::Result<()> {
        ctx.record(self.name, "restart");
        Ok(())
    }

    fn on_ignored(&mut self, ctx: &mut SimContext) -> eyre::Result<()> {
        ctx.record(self.name, "ignored");
        Ok(())
    }

    fn on_interrupt(&mut self, ctx: &mut SimContext) -> eyre::Result<()> {
        ctx.record(self.name, "interrupt");
        Ok(())
    }

    fn on_complete(&mut self, ctx: &mut SimContext) -> eyre::Result<()> {
        ctx.record(self.name, "complete");
        if self.fail_complete {
            eyre::bail!("{} could not release", self.name);
        }
        Ok(())
    }

    fn on_timeout(&mut self, ctx: &mut SimContext) -> eyre::Result<()> {
        ctx.record(self.name, "timeout");
        Ok(())
    }
}

struct Harness {
    orchestrator: Orchestrator<SimContext>,
    ctx: SimContext,
    clock: ManualClock,
}

impl Harness {
    fn new(root: Probe) -> Self {
        Self::with_config(root, SchedulerConfig::default())
    }

    fn with_config(root: Probe, config: SchedulerConfig) -> Self {
        Self::with_env(root, config, HashMap::new())
    }

    fn with_env(root: Probe, config: SchedulerConfig, env: HashMap<String, String>) -> Self {
        let clock = ManualClock::new();
        let mut orchestrator = Orchestrator::new(config).with_clock(Arc::new(clock.clone()));
        let mut ctx = SimContext::new(ConfigResolver::default().with_env(EnvSource::Fixed(env)));
        orchestrator.set_root_task(&mut ctx, Some(root.boxed())).unwrap();
        Self {
            orchestrator,
            ctx,
            clock,
        }
    }

    fn tick(&mut self) -> TickOutcome {
        self.orchestrator.tick(&mut self.ctx).unwrap()
    }

    fn advance(&self, secs: f64) {
        self.clock.advance_secs(secs);
    }

    fn events(&self, task: &str) -> Vec<&str> {
        self.ctx.events_for(task)
    }

    fn status(&self, name: &str) -> TaskStatus {
        self.orchestrator.root().unwrap().find(name).unwrap().status()
    }

    fn reason(&self, name: &str) -> Option<StatusReason> {
        self.orchestrator.root().unwrap().find(name).unwrap().state().reason
    }
}

fn active_leaves(node: &NodeSnapshot) -> usize {
    let mut count = 0;
    let mut stack = vec![node];
    while let Some(node) = stack.pop() {
        let in_flight = !matches!(node.status, TaskStatus::NotStarted | TaskStatus::Completed);
        if node.children.is_empty() && in_flight {
            count += 1;
        }
        stack.extend(node.children.iter());
    }
    count
}

#[test]
fn test_single_active_leaf() {
    let tree = Probe::seq(
        "root",
        vec![
            Probe::leaf("a").done_after(1),
            Probe::seq("b", vec![Probe::leaf("c").done_after(2), Probe::leaf("d").done_after(1)]),
            Probe::leaf("e"),
        ],
    );
    let mut h = Harness::new(tree);

    let mut outcome = TickOutcome::Running;
    for _ in 0..20 {
        outcome = h.tick();
        let snapshot = h.orchestrator.snapshot("check").unwrap();
        assert!(active_leaves(&snapshot.root) <= 1);
        if outcome.is_finished() {
            break;
        }
    }

    assert_eq!(outcome, TickOutcome::TreeCompleted(StatusReason::Completed));
    for leaf in ["a", "c", "d", "e"] {
        let executes = h.events(leaf).iter().filter(|e| **e == "execute").count();
        assert_eq!(executes, 1, "{} executed {} times", leaf, executes);
    }
}

#[test]
fn test_delay_before_start_gates_execute() {
    let mut h = Harness::new(Probe::leaf("wait").with_options(TaskOptions::default().with_delay_before_start(Duration::from_secs(1))));

    h.tick();
    assert_eq!(h.events("wait"), vec!["before_start"]);
    assert_eq!(h.status("wait"), TaskStatus::AwaitingDelayBeforeStart);

    h.advance(0.5);
    h.tick();
    assert_eq!(h.events("wait"), vec!["before_start"]);

    h.advance(0.5);
    assert_eq!(h.tick(), TickOutcome::TreeCompleted(StatusReason::Completed));
    assert_eq!(h.events("wait"), vec!["before_start", "execute", "did", "complete"]);
}

#[test]
fn test_delay_after_complete() {
    let tree = Probe::seq(
        "root",
        vec![
            Probe::leaf("drop").with_options(TaskOptions::default().with_delay_after_complete(Duration::from_secs(1))),
            Probe::leaf("next"),
        ],
    );
    let mut h = Harness::new(tree);

    h.tick();
    assert_eq!(h.status("drop"), TaskStatus::AwaitingDelayToComplete);
    h.advance(0.5);
    h.tick();
    assert_eq!(h.status("drop"), TaskStatus::AwaitingDelayToComplete);

    h.advance(0.5);
    h.tick();
    assert_eq!(h.status("drop"), TaskStatus::Completed);
    assert_eq!(h.events("drop"), vec!["before_start", "execute", "did", "complete"]);
}

#[test]
fn test_non_terminable_times_out_without_did() {
    let options = TaskOptions::default().non_terminable().with_timeout_secs(2.0);
    let mut h = Harness::new(Probe::leaf("pump").with_options(options));

    assert_eq!(h.tick(), TickOutcome::Running);
    h.advance(1.0);
    assert_eq!(h.tick(), TickOutcome::Running);
    h.advance(1.0);
    assert_eq!(h.tick(), TickOutcome::TreeCompleted(StatusReason::Timeout));

    let events = h.events("pump");
    assert!(!events.contains(&"did"));
    assert_eq!(events.last(), Some(&"complete"));
    assert!(events.contains(&"timeout"));
    assert_eq!(h.reason("pump"), Some(StatusReason::Timeout));
}

#[test]
fn test_tree_wide_abort() {
    let leaf = Probe::leaf("leaf")
        .never_done()
        .with_options(TaskOptions::default().with_timeout_secs(1.0).timeout_tree());
    let tree = Probe::seq("root", vec![Probe::seq("mid", vec![leaf]), Probe::leaf("never")]);
    let mut h = Harness::new(tree);

    h.tick();
    h.advance(1.0);
    assert_eq!(h.tick(), TickOutcome::TreeCompleted(StatusReason::Timeout));

    for name in ["leaf", "mid", "root"] {
        assert_eq!(h.status(name), TaskStatus::Completed);
        assert_eq!(h.reason(name), Some(StatusReason::Timeout));
        assert_eq!(h.events(name).iter().filter(|e| **e == "timeout").count(), 1);
    }
    assert!(h.events("never").is_empty());
    assert_eq!(h.orchestrator.stats().timeouts, 3);
}

#[test]
fn test_timeout_without_tree_flag_advances_parent() {
    let tree = Probe::seq(
        "root",
        vec![
            Probe::leaf("slow").never_done().with_options(TaskOptions::default().with_timeout_secs(1.0)),
            Probe::leaf("next"),
        ],
    );
    let mut h = Harness::new(tree);

    h.tick();
    h.advance(1.0);
    assert_eq!(h.tick(), TickOutcome::Running);
    assert_eq!(h.reason("slow"), Some(StatusReason::Timeout));
    assert_eq!(h.orchestrator.root().unwrap().current_task_index(), 1);

    assert_eq!(h.tick(), TickOutcome::TreeCompleted(StatusReason::Completed));
    assert!(h.events("root").iter().all(|e| *e != "timeout"));
}

#[test]
fn test_until_unflagged_cascade_stops_at_unflagged_ancestor() {
    let leaf = Probe::leaf("leaf")
        .never_done()
        .with_options(TaskOptions::default().with_timeout_secs(1.0).timeout_tree());
    let tree = Probe::seq("root", vec![Probe::seq("mid", vec![leaf]), Probe::leaf("after")]);
    let config = SchedulerConfig::default().with_timeout_cascade(TimeoutCascade::UntilUnflagged);
    let mut h = Harness::with_config(tree, config);

    h.tick();
    h.advance(1.0);
    assert_eq!(h.tick(), TickOutcome::Running);
    assert_eq!(h.reason("leaf"), Some(StatusReason::Timeout));
    assert_eq!(h.reason("mid"), Some(StatusReason::Timeout));
    assert_eq!(h.status("root"), TaskStatus::Running);

    assert_eq!(h.tick(), TickOutcome::TreeCompleted(StatusReason::Completed));
    assert_eq!(h.events("after"), vec!["before_start", "execute", "did", "complete"]);
}

#[test]
fn test_restart_resets_cursor() {
    let signals = Signals::default();
    let tree = Probe::seq(
        "root",
        vec![Probe::leaf("a"), Probe::leaf("b"), Probe::leaf("c").never_done()],
    )
    .signals(&signals);
    let mut h = Harness::new(tree);

    h.tick();
    h.tick();
    h.tick();
    assert_eq!(h.orchestrator.root().unwrap().current_task_index(), 2);
    assert_eq!(h.status("c"), TaskStatus::Running);

    signals.request_restart();
    assert_eq!(h.tick(), TickOutcome::Restarted);

    let root = h.orchestrator.root().unwrap();
    assert_eq!(root.status(), TaskStatus::NotStarted);
    assert_eq!(root.current_task_index(), 0);
    assert_eq!(root.retry_count(), 1);
    assert!(!h.events("root").contains(&"complete"));
    assert_eq!(h.events("root").last(), Some(&"restart"));
    assert_eq!(h.events("c").last(), Some(&"interrupt"));

    // The next tick starts over from the first child.
    h.tick();
    let executes = h.events("a").iter().filter(|e| **e == "execute").count();
    assert_eq!(executes, 2);
}

#[test]
fn test_leaf_restart_runs_again() {
    let signals = Signals::default();
    let mut h = Harness::new(Probe::leaf("attack").never_done().signals(&signals));

    h.tick();
    signals.request_restart();
    assert_eq!(h.tick(), TickOutcome::Restarted);
    let root = h.orchestrator.root().unwrap();
    assert_eq!(root.status(), TaskStatus::NotStarted);
    assert_eq!(root.retry_count(), 1);

    h.tick();
    assert_eq!(h.status("attack"), TaskStatus::Running);
    assert_eq!(
        h.events("attack"),
        vec!["before_start", "execute", "did", "ping", "restart", "before_start", "execute", "did", "ping"]
    );
}

#[test]
fn test_restart_scope_leaf_ignores_ancestors() {
    let signals = Signals::default();
    let tree = Probe::seq("root", vec![Probe::leaf("busy").never_done()]).signals(&signals);
    let config = SchedulerConfig::default().with_restart_scope(RestartScope::Leaf);
    let mut h = Harness::with_config(tree, config);

    h.tick();
    signals.request_restart();
    assert_eq!(h.tick(), TickOutcome::Running);
    assert_eq!(h.tick(), TickOutcome::Running);
    assert_eq!(h.orchestrator.root().unwrap().retry_count(), 0);
    assert!(signals.restart.load(Ordering::SeqCst));
}

#[test]
fn test_manual_termination_gate() {
    let signals = Signals::default();
    let tree = Probe::seq(
        "root",
        vec![
            Probe::leaf("deposit")
                .signals(&signals)
                .with_options(TaskOptions::default().manually_terminable()),
            Probe::leaf("after"),
        ],
    );
    let mut h = Harness::new(tree);

    h.tick();
    assert_eq!(h.status("deposit"), TaskStatus::AwaitingManualTermination);
    for _ in 0..3 {
        assert_eq!(h.tick(), TickOutcome::Running);
        assert_eq!(h.status("deposit"), TaskStatus::AwaitingManualTermination);
    }
    assert!(!h.events("deposit").contains(&"complete"));
    assert!(h.events("after").is_empty());

    signals.confirm();
    assert_eq!(h.tick(), TickOutcome::Running);
    assert_eq!(h.status("deposit"), TaskStatus::Completed);
    assert_eq!(h.reason("deposit"), Some(StatusReason::Completed));
    assert_eq!(h.orchestrator.root().unwrap().current_task_index(), 1);

    assert_eq!(h.tick(), TickOutcome::TreeCompleted(StatusReason::Completed));
}

#[test]
fn test_interrupt_cascade_order() {
    let tree = Probe::seq("root", vec![Probe::seq("mid", vec![Probe::leaf("leaf").never_done()])]);
    let mut h = Harness::new(tree);
    h.tick();

    h.orchestrator
        .set_root_task(&mut h.ctx, Some(Probe::leaf("fresh").boxed()))
        .unwrap();

    let interrupted: Vec<&str> = h
        .ctx
        .journal()
        .iter()
        .filter(|e| e.event == "interrupt")
        .map(|e| e.task.as_str())
        .collect();
    assert_eq!(interrupted, vec!["leaf", "mid", "root"]);
    assert_eq!(h.orchestrator.root().unwrap().name(), "fresh");
    assert_eq!(h.orchestrator.stats().interrupts, 3);
}

#[test]
fn test_interrupt_cascade_reports_first_error_after_install() {
    struct Stubborn;

    impl Task<SimContext> for Stubborn {
        fn kind(&self) -> TaskKind {
            TaskKind::HoldKey
        }

        fn did(&mut self, _ctx: &mut SimContext) -> eyre::Result<bool> {
            Ok(false)
        }

        fn on_interrupt(&mut self, _ctx: &mut SimContext) -> eyre::Result<()> {
            eyre::bail!("key stuck")
        }
    }

    let mut ctx = SimContext::default();
    let mut orchestrator = Orchestrator::new(SchedulerConfig::default()).with_clock(Arc::new(ManualClock::new()));
    orchestrator.set_root_task(&mut ctx, Some(Box::new(Stubborn))).unwrap();
    orchestrator.tick(&mut ctx).unwrap();

    let err = orchestrator
        .set_root_task(&mut ctx, Some(Probe::leaf("fresh").boxed()))
        .unwrap_err();
    assert!(matches!(err, TaskTreeError::Hook { .. }));
    assert!(err.to_string().contains("key stuck"));
    assert_eq!(orchestrator.root().unwrap().name(), "fresh");
}

#[test]
fn test_sequential_bubbling() {
    let tree = Probe::seq(
        "root",
        vec![Probe::seq("mid", vec![Probe::leaf("x")]), Probe::leaf("y")],
    );
    let mut h = Harness::new(tree);

    assert_eq!(h.tick(), TickOutcome::Running);
    assert_eq!(h.status("x"), TaskStatus::Completed);
    assert_eq!(h.status("mid"), TaskStatus::Completed);
    assert_eq!(h.orchestrator.root().unwrap().current_task_index(), 1);

    assert_eq!(h.tick(), TickOutcome::TreeCompleted(StatusReason::Completed));
    let completions: Vec<(u64, &str)> = h
        .ctx
        .journal()
        .iter()
        .filter(|e| e.event == "complete")
        .map(|e| (e.tick, e.task.as_str()))
        .collect();
    assert_eq!(completions, vec![(1, "x"), (1, "mid"), (2, "y"), (2, "root")]);
}

#[test]
fn test_looping_sequence() {
    let tree = Probe::seq("patrol", vec![Probe::leaf("step")]).looping(1);
    let mut h = Harness::new(tree);

    assert_eq!(h.tick(), TickOutcome::Running);
    let root = h.orchestrator.root().unwrap();
    assert_eq!(root.status(), TaskStatus::NotStarted);
    assert_eq!(root.retry_count(), 1);

    assert_eq!(h.tick(), TickOutcome::TreeCompleted(StatusReason::Completed));
    assert_eq!(h.events("step").iter().filter(|e| **e == "complete").count(), 2);
    assert_eq!(h.orchestrator.stats().restarts, 1);
}

#[test]
fn test_ignored_task_skips_execute() {
    let tree = Probe::seq("root", vec![Probe::leaf("loot").ignored(), Probe::leaf("next")]);
    let mut h = Harness::new(tree);

    h.tick();
    assert_eq!(h.events("loot"), vec!["before_start", "ignored", "complete"]);
    assert_eq!(h.reason("loot"), Some(StatusReason::Ignored));
    assert_eq!(h.orchestrator.stats().ignored, 1);
}

#[test]
fn test_root_timeout_guard() {
    let memory = MemoryDiagnostics::new();
    let tree = Probe::seq(
        "root",
        vec![Probe::leaf("pump").with_options(TaskOptions::default().non_terminable())],
    )
    .with_options(TaskOptions::default().with_timeout_secs(2.0));

    let clock = ManualClock::new();
    let mut orchestrator = Orchestrator::new(SchedulerConfig::default())
        .with_clock(Arc::new(clock.clone()))
        .with_diagnostics(Box::new(memory.clone()));
    let mut ctx = SimContext::new(ConfigResolver::default().with_env(EnvSource::Fixed(HashMap::new())));
    orchestrator.set_root_task(&mut ctx, Some(tree.boxed())).unwrap();

    orchestrator.tick(&mut ctx).unwrap();
    clock.advance_secs(2.0);
    assert_eq!(
        orchestrator.tick(&mut ctx).unwrap(),
        TickOutcome::TreeCompleted(StatusReason::Timeout)
    );
    assert!(ctx.events_for("pump").contains(&"timeout"));
    assert!(ctx.events_for("root").contains(&"timeout"));

    let snapshots = memory.snapshots();
    assert_eq!(snapshots.len(), 1);
    assert!(snapshots[0].trigger.starts_with("timeout pump#"));
}

#[test]
fn test_timeout_override_from_env() {
    let mut env = HashMap::new();
    env.insert("TASKTREE_WALK_TIMEOUT_SECS".to_string(), "1.5".to_string());
    let mut h = Harness::with_env(
        Probe::leaf("walk").of_kind(TaskKind::Walk).never_done(),
        SchedulerConfig::default(),
        env,
    );

    h.tick();
    h.advance(1.0);
    assert_eq!(h.tick(), TickOutcome::Running);
    h.advance(0.5);
    assert_eq!(h.tick(), TickOutcome::TreeCompleted(StatusReason::Timeout));
}

#[test]
fn test_hook_error_propagates_by_default() {
    let mut h = Harness::new(Probe::seq("root", vec![Probe::leaf("bad").failing()]));

    let err = h.orchestrator.tick(&mut h.ctx).unwrap_err();
    let bad_id = h.orchestrator.root().unwrap().find("bad").unwrap().id();
    assert_eq!(err.task_id(), Some(bad_id));
    assert!(err.to_string().contains("bad exploded"));
    assert!(h.orchestrator.has_active_tree());
    assert_eq!(h.orchestrator.stats().hook_failures, 0);
}

#[test]
fn test_hook_error_times_out_task_when_configured() {
    let tree = Probe::seq("root", vec![Probe::leaf("bad").failing(), Probe::leaf("good")]);
    let config = SchedulerConfig::default().with_hook_errors(HookErrorPolicy::TimeoutTask);
    let mut h = Harness::with_config(tree, config);

    assert_eq!(h.tick(), TickOutcome::Running);
    assert_eq!(h.reason("bad"), Some(StatusReason::Timeout));
    assert_eq!(h.orchestrator.stats().hook_failures, 1);

    assert_eq!(h.tick(), TickOutcome::TreeCompleted(StatusReason::Completed));
    assert_eq!(h.events("good"), vec!["before_start", "execute", "did", "complete"]);
}

#[test]
fn test_diagnostics_failures_are_swallowed() {
    struct Broken;

    impl DiagnosticSink for Broken {
        fn capture(&mut self, _snapshot: &TreeSnapshot) -> Result<()> {
            Err(TaskTreeError::Diagnostics("disk full".to_string()))
        }
    }

    let clock = ManualClock::new();
    let mut orchestrator = Orchestrator::new(SchedulerConfig::default())
        .with_clock(Arc::new(clock.clone()))
        .with_diagnostics(Box::new(Broken));
    let mut ctx = SimContext::default();
    let leaf = Probe::leaf("slow").never_done().with_options(TaskOptions::default().with_timeout_secs(1.0));
    orchestrator.set_root_task(&mut ctx, Some(leaf.boxed())).unwrap();

    orchestrator.tick(&mut ctx).unwrap();
    clock.advance_secs(1.0);
    assert_eq!(
        orchestrator.tick(&mut ctx).unwrap(),
        TickOutcome::TreeCompleted(StatusReason::Timeout)
    );
}

#[test]
fn test_failing_on_complete_still_advances_sequence() {
    let tree = Probe::seq("root", vec![Probe::leaf("a").failing_on_complete(), Probe::leaf("b")]);
    let mut h = Harness::new(tree);

    let err = h.orchestrator.tick(&mut h.ctx).unwrap_err();
    assert!(matches!(err, TaskTreeError::Hook { hook: Hook::OnComplete, .. }));
    assert_eq!(h.status("a"), TaskStatus::Completed);
    assert_eq!(h.orchestrator.root().unwrap().current_task_index(), 1);

    assert_eq!(h.tick(), TickOutcome::TreeCompleted(StatusReason::Completed));
    assert_eq!(h.events("b"), vec!["before_start", "execute", "did", "complete"]);
}

#[test]
fn test_failing_on_complete_under_timeout_policy() {
    let tree = Probe::seq("root", vec![Probe::leaf("a").failing_on_complete(), Probe::leaf("b")]);
    let config = SchedulerConfig::default().with_hook_errors(HookErrorPolicy::TimeoutTask);
    let mut h = Harness::with_config(tree, config);

    assert_eq!(h.tick(), TickOutcome::Running);
    assert_eq!(h.reason("a"), Some(StatusReason::Completed));
    assert_eq!(h.orchestrator.stats().hook_failures, 1);

    assert_eq!(h.tick(), TickOutcome::TreeCompleted(StatusReason::Completed));
    assert_eq!(h.events("b"), vec!["before_start", "execute", "did", "complete"]);
}

#[test]
fn test_should_restart_polled_once_per_tick() {
    let signals = Signals::default();
    let mut h = Harness::new(Probe::leaf("walk").never_done().signals(&signals));

    h.tick();
    assert_eq!(signals.restart_polls(), 1);
    h.tick();
    assert_eq!(signals.restart_polls(), 2);
}

#[test]
fn test_delayed_leaf_polls_restart_once_per_tick() {
    let signals = Signals::default();
    let options = TaskOptions::default().with_delay_before_start(Duration::from_secs(1));
    let mut h = Harness::new(Probe::leaf("wait").never_done().signals(&signals).with_options(options));

    h.tick();
    assert_eq!(signals.restart_polls(), 0);

    h.advance(1.0);
    h.tick();
    assert_eq!(h.events("wait"), vec!["before_start", "execute", "did", "ping"]);
    assert_eq!(signals.restart_polls(), 1);

    h.tick();
    assert_eq!(signals.restart_polls(), 2);
}

#[test]
fn test_root_timeout_skips_unstarted_leaf() {
    let tree = Probe::seq("root", vec![Probe::leaf("a"), Probe::leaf("b")])
        .with_options(TaskOptions::default().with_timeout_secs(1.0));
    let mut h = Harness::new(tree);

    h.tick();
    assert_eq!(h.status("a"), TaskStatus::Completed);

    h.advance(1.0);
    assert_eq!(h.tick(), TickOutcome::TreeCompleted(StatusReason::Timeout));
    assert!(h.events("b").is_empty());
    assert_eq!(h.status("b"), TaskStatus::NotStarted);
    assert_eq!(h.events("root"), vec!["before_start", "timeout", "complete"]);
    assert_eq!(h.orchestrator.stats().timeouts, 1);
}
