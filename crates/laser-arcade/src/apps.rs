//! App consumer interface.
//!
//! Games and tools are polymorphic over one capability set: take pointer
//! events, advance their simulation, draw. The core only ever calls
//! through this trait and never knows concrete variants; the launcher
//! picks them out of an open name-to-factory registry.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::fusion::{PointerEvent, PointerEventKind};
use crate::pipeline::TickOutput;

/// Capability set every app consumer implements.
pub trait PointerApp {
    fn name(&self) -> &str;

    /// Pointer event delivery: moves, presses, clicks.
    fn handle_pointer(&mut self, event: &PointerEvent);

    /// Advance the app's own state by `dt`.
    fn update(&mut self, dt: Duration);

    /// Render. The default is a no-op so headless apps and tests can
    /// skip presentation entirely.
    fn draw(&mut self) {}
}

type AppFactory = Box<dyn Fn() -> Box<dyn PointerApp>>;

/// Open registry of app constructors, keyed by display name.
#[derive(Default)]
pub struct AppRegistry {
    factories: BTreeMap<String, AppFactory>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn PointerApp> + 'static,
    ) {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn create(&self, name: &str) -> Option<Box<dyn PointerApp>> {
        self.factories.get(name).map(|f| f())
    }
}

/// Deliver one tick's pointer activity to an app: a move for the unified
/// position (when active) followed by any click.
pub fn route_tick(app: &mut dyn PointerApp, output: &TickOutput, now: Instant) {
    if let Some(position) = output.pointer.position {
        app.handle_pointer(&PointerEvent {
            kind: PointerEventKind::Move,
            position,
            source: output.pointer.source,
            at: now,
        });
    }
    if let Some(click) = output.click {
        app.handle_pointer(&PointerEvent {
            kind: PointerEventKind::Click,
            position: click.position,
            source: click.source,
            at: click.at,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingApp {
        moves: usize,
        clicks: usize,
    }

    impl PointerApp for CountingApp {
        fn name(&self) -> &str {
            "counting"
        }

        fn handle_pointer(&mut self, event: &PointerEvent) {
            match event.kind {
                PointerEventKind::Move => self.moves += 1,
                PointerEventKind::Click => self.clicks += 1,
                _ => {}
            }
        }

        fn update(&mut self, _dt: Duration) {}
    }

    #[test]
    fn registry_creates_by_name() {
        let mut registry = AppRegistry::new();
        registry.register("counting", || Box::<CountingApp>::default());
        registry.register("another", || Box::<CountingApp>::default());

        assert_eq!(registry.names(), vec!["another", "counting"]);
        assert!(registry.create("counting").is_some());
        assert!(registry.create("missing").is_none());
    }

    #[test]
    fn created_apps_receive_events() {
        let mut registry = AppRegistry::new();
        registry.register("counting", || Box::<CountingApp>::default());
        let mut app = registry.create("counting").unwrap();

        app.handle_pointer(&PointerEvent {
            kind: PointerEventKind::Click,
            position: nalgebra::Point2::new(1.0, 2.0),
            source: crate::fusion::PointerSource::Laser,
            at: Instant::now(),
        });
        app.update(Duration::from_millis(16));
        app.draw();
    }
}
