//! Developer tools for hookline: a timestamped trace sink and a checker that
//! replays the trace against the lifecycle ordering rules.

pub mod checker;
pub mod timeline;

pub use checker::{Violation, check};
pub use timeline::{Entry, Timeline};

/// Logs every violation found in `timeline` and returns how many there were.
pub fn report(timeline: &Timeline) -> usize {
    let violations = timeline.check();
    for v in &violations {
        log::warn!("lifecycle violation: {v}");
    }
    violations.len()
}

#[cfg(test)]
mod tests {
    use hookline_core::*;

    use super::*;

    #[test]
    fn test_real_trace_is_clean() {
        let timeline = Timeline::new();
        let mut r = Reconciler::new(timeline.clone());

        let root = r.mount::<Template>(TemplateProps::new("x")).unwrap();
        let count = r.mount_child::<CountView>(root, TemplateProps::new("1")).unwrap();
        r.update_props(root, TemplateProps::new("y")).unwrap();
        r.update_props(count, TemplateProps::new("1")).unwrap();
        r.force_update(count).unwrap();
        r.unmount(root).unwrap();

        assert!(timeline.check().is_empty(), "{:?}", timeline.check());
        assert_eq!(report(&timeline), 0);
        assert_eq!(timeline.lines().len(), timeline.len());
        assert!(timeline.lines()[0].ends_with("Template::initialize props=TemplateProps { value: \"x\" }"));
    }

    #[test]
    fn test_entries_are_ordered_in_time() {
        let timeline = Timeline::new();
        let mut r = Reconciler::new(timeline.clone());
        let t = r.mount::<Template>(TemplateProps::new("x")).unwrap();
        r.update_props(t, TemplateProps::new("y")).unwrap();

        let entries = timeline.for_instance(t.id());
        assert_eq!(entries.len(), 9);
        assert!(entries.windows(2).all(|w| w[0].at <= w[1].at));
    }

    #[test]
    fn test_json_export() {
        let timeline = Timeline::new();
        let mut r = Reconciler::new(timeline.clone());
        let t = r.mount::<Template>(TemplateProps::new("x")).unwrap();
        r.unmount(t).unwrap();

        let json: serde_json::Value = serde_json::from_str(&timeline.to_json()).unwrap();
        let hooks: Vec<&str> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["hook"].as_str().unwrap())
            .collect();
        assert_eq!(
            hooks,
            ["initialize", "derive_state_from_props", "render", "did_mount", "will_unmount"]
        );
        assert_eq!(json[0]["component"], "Template");
        assert_eq!(json[0]["args"][0][0], "props");

        timeline.clear();
        assert!(timeline.is_empty());
        assert_eq!(timeline.to_json(), "[]");
    }
}
