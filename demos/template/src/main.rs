use hookline_core::*;
use hookline_devtools::{Timeline, report};

/// Sends every record to the log and to the timeline.
struct Tee {
    log: LogSink,
    timeline: Timeline,
}

impl DiagnosticSink for Tee {
    fn record(&self, record: &HookRecord) {
        self.log.record(record);
        self.timeline.record(record);
    }
}

/// Child that fails to render once its value reads "boom".
struct Fragile;

impl Component for Fragile {
    type Props = TemplateProps;
    type State = ();
    type Snapshot = ();

    fn get_snapshot_before_update(&self, _: &TemplateProps, _: &()) {}

    fn initialize(_props: &TemplateProps) -> (Self, ()) {
        (Fragile, ())
    }

    fn render(&self, props: &TemplateProps, _: &()) -> Result<Element, ComponentError> {
        if props.value == "boom" {
            return Err(ComponentError::new("Boom from demo component!"));
        }
        Ok(Element::new("p").text(props.value.clone()))
    }
}

fn section(title: &str, timeline: &Timeline) {
    println!("== {title}");
    for line in timeline.lines() {
        println!("  {line}");
    }
    timeline.clear();
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let timeline = Timeline::new();
    let mut r = Reconciler::new(Tee {
        log: LogSink,
        timeline: timeline.clone(),
    });
    let mut violations = 0;

    let t = r.mount::<Template>(TemplateProps::new("x"))?;
    violations += report(&timeline);
    section("mount", &timeline);
    println!("  state: {:?}", r.state(t));

    r.update_props(t, TemplateProps::new("y"))?;
    violations += report(&timeline);
    section("update", &timeline);

    let pure = r.mount::<Template<PurePolicy>>(TemplateProps::new("same"))?;
    timeline.clear();
    let outcome = r.update_props(pure, TemplateProps::new("same"))?;
    violations += report(&timeline);
    section(&format!("update rejected by should_update ({outcome:?})"), &timeline);

    let child = r.mount_child::<Fragile>(t, TemplateProps::new("fine"))?;
    let count = r.mount_child::<CountView>(t, TemplateProps::new("7"))?;
    timeline.clear();
    match r.update_props(child, TemplateProps::new("boom")) {
        Err(LifecycleError::Captured { boundary, error }) => {
            log::info!("{boundary:?} recovered from {error}");
        }
        other => anyhow::bail!("expected the boundary to capture, got {other:?}"),
    }
    violations += report(&timeline);
    section("descendant failure", &timeline);
    println!("  fallback output: {}", r.output(t).map(|o| o.to_string()).unwrap_or_default());
    println!("  count still mounted: {}", r.is_mounted(count));

    r.unmount(t)?;
    violations += report(&timeline);
    section("unmount", &timeline);
    if let Err(e) = r.force_update(t) {
        println!("  after unmount: {e}");
    }

    anyhow::ensure!(violations == 0, "{violations} lifecycle violations");
    Ok(())
}
