use std::fmt::Write as _;

use web_time::Instant;

use hookdom_core::{Dom, NodeId, NodeView, RenderStats, Runtime};

pub struct Hud {
    pub inspector_enabled: bool,
    frame_count: u64,
    last_frame: Option<Instant>,
    fps_smooth: f32,
    pub metrics: Option<Metrics>,
}

impl Default for Hud {
    fn default() -> Self {
        Self::new()
    }
}

impl Hud {
    pub fn new() -> Self {
        Self {
            inspector_enabled: false,
            frame_count: 0,
            last_frame: None,
            fps_smooth: 0.0,
            metrics: None,
        }
    }

    pub fn toggle_inspector(&mut self) {
        self.inspector_enabled = !self.inspector_enabled;
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn fps(&self) -> f32 {
        self.fps_smooth
    }

    /// Advances the frame counter and returns the status line.
    pub fn overlay(&mut self) -> String {
        self.frame_count += 1;
        let now = Instant::now();
        if let Some(prev) = self.last_frame.replace(now) {
            let dt = (now - prev).as_secs_f32();
            if dt > 0.0 {
                let fps = 1.0 / dt;
                // simple EMA
                let a = 0.2;
                self.fps_smooth = if self.fps_smooth == 0.0 {
                    fps
                } else {
                    (1.0 - a) * self.fps_smooth + a * fps
                };
            }
        }
        let mut lines = vec![
            format!("frame: {}", self.frame_count),
            format!("fps: {:.1}", self.fps_smooth),
        ];
        if let Some(m) = &self.metrics {
            lines.push(format!("renders: {}", m.renders));
            lines.push(format!("bail-outs: {}", m.bailouts));
            lines.push(format!("mounts: {}/{}", m.mounts, m.unmounts));
            lines.push(format!("dom ops: {}", m.dom_ops));
            lines.push(format!("instances: {}", m.instances));
        }
        lines.join("  |  ")
    }
}

/// Work done since the previous snapshot. Counters that went backwards (a
/// fresh runtime handed to the same inspector) read as zero.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metrics {
    pub renders: u64,
    pub bailouts: u64,
    pub memo_skips: u64,
    pub mounts: u64,
    pub unmounts: u64,
    pub dom_ops: u64,
    /// Live component instances at snapshot time.
    pub instances: usize,
}

impl Metrics {
    pub fn between(before: &RenderStats, after: &RenderStats, instances: usize) -> Self {
        Self {
            renders: after.renders.saturating_sub(before.renders),
            bailouts: after.bailouts.saturating_sub(before.bailouts),
            memo_skips: after.memo_skips.saturating_sub(before.memo_skips),
            mounts: after.mounts.saturating_sub(before.mounts),
            unmounts: after.unmounts.saturating_sub(before.unmounts),
            dom_ops: after.dom_ops.saturating_sub(before.dom_ops),
            instances,
        }
    }
}

pub struct Inspector {
    pub hud: Hud,
    last: RenderStats,
}

impl Default for Inspector {
    fn default() -> Self {
        Self::new()
    }
}

impl Inspector {
    pub fn new() -> Self {
        Self {
            hud: Hud::new(),
            last: RenderStats::default(),
        }
    }

    /// Snapshots the runtime after a frame. Returns the HUD line while the
    /// inspector is enabled.
    pub fn frame<D: Dom>(&mut self, rt: &Runtime<D>) -> Option<String> {
        let stats = rt.stats();
        let metrics = Metrics::between(&self.last, &stats, rt.instance_count());
        self.last = stats;
        if metrics.renders > 0 {
            log::debug!(
                "frame metrics: {} renders, {} bail-outs, {} dom ops",
                metrics.renders,
                metrics.bailouts,
                metrics.dom_ops
            );
        }
        self.hud.metrics = Some(metrics);
        if self.hud.inspector_enabled {
            Some(self.hud.overlay())
        } else {
            None
        }
    }
}

/// Indented text rendering of what is committed under `container`.
pub fn tree_dump<D: Dom>(rt: &Runtime<D>, container: NodeId) -> String {
    let mut out = String::new();
    rt.walk(container, &mut |depth, node| {
        let indent = "  ".repeat(depth);
        let _ = match node {
            NodeView::Empty => writeln!(out, "{indent}(empty)"),
            NodeView::Text(text) => writeln!(out, "{indent}{text:?}"),
            NodeView::Tag { tag, props, .. } => match props.key() {
                Some(key) => writeln!(out, "{indent}<{tag} key={key}>"),
                None => writeln!(out, "{indent}<{tag}>"),
            },
            NodeView::Component {
                name, memo, slots, ..
            } => {
                let (state, effects, memos) = slots;
                writeln!(
                    out,
                    "{indent}<{name}{}> [state {state}, effects {effects}, memos {memos}]",
                    if memo { " memo" } else { "" }
                )
            }
        };
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookdom_core::*;

    fn row(cx: &mut RenderContext<'_>, props: &Props) -> Element {
        let (done, _) = use_state(cx, || false);
        let label = props.get_str("label").unwrap_or_default().to_string();
        create_element(
            "li",
            Props::new().with("className", if done { "done" } else { "open" }),
            children![label],
        )
    }

    const ROW: Component = memo(Component::new("Row", row));

    fn todos(_cx: &mut RenderContext<'_>, _props: &Props) -> Element {
        let rows: Vec<Element> = ["milk", "eggs"]
            .iter()
            .enumerate()
            .map(|(i, label)| create_element(ROW, Props::new().keyed(i).with("label", *label), children![]))
            .collect();
        create_element("ul", Props::new().with("ordered", true), children![rows, None::<Element>])
    }

    #[test]
    fn dumps_components_and_tags() {
        let mut dom = MemoryDom::new();
        let root = dom.create_element("main");
        let rt = Runtime::new(dom);
        rt.render(create_element(Component::new("Todos", todos), Props::new(), children![]), root)
            .unwrap();

        insta::assert_snapshot!(tree_dump(&rt, root), @r#"
        <Todos> [state 0, effects 0, memos 0]
          <ul>
            <Row memo> [state 1, effects 0, memos 0]
              <li>
                "milk"
            <Row memo> [state 1, effects 0, memos 0]
              <li>
                "eggs"
        "#);
    }

    #[test]
    fn metrics_are_per_frame_deltas() {
        let mut dom = MemoryDom::new();
        let root = dom.create_element("main");
        let rt = Runtime::new(dom);
        let mut inspector = Inspector::new();

        rt.render(create_element(Component::new("Todos", todos), Props::new(), children![]), root)
            .unwrap();
        assert_eq!(inspector.frame(&rt), None);
        let first = inspector.hud.metrics.clone().unwrap();
        assert_eq!(first.mounts, 3);
        assert_eq!(first.renders, 3);
        assert_eq!(first.instances, 3);

        inspector.hud.toggle_inspector();
        let line = inspector.frame(&rt).unwrap();
        assert!(line.starts_with("frame: 1"));
        assert!(line.contains("renders: 0"));
        assert_eq!(inspector.hud.frame_count(), 1);
    }

    #[test]
    fn switching_to_a_fresh_runtime_reads_as_no_work() {
        let mut inspector = Inspector::new();
        {
            let mut dom = MemoryDom::new();
            let root = dom.create_element("main");
            let rt = Runtime::new(dom);
            rt.render(create_element(Component::new("Todos", todos), Props::new(), children![]), root)
                .unwrap();
            inspector.frame(&rt);
        }

        let mut dom = MemoryDom::new();
        let root = dom.create_element("main");
        let rt = Runtime::new(dom);
        rt.render(h("hr", Props::new()), root).unwrap();
        inspector.frame(&rt);
        let metrics = inspector.hud.metrics.clone().unwrap();
        assert_eq!(metrics.renders, 0);
        assert_eq!(metrics.dom_ops, 0);
        assert_eq!(metrics.instances, 0);
    }
}
