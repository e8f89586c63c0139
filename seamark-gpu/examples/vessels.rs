//! Seamark Vessel Rendering Demo
//!
//! Wires the standard vessel attribute set and both render passes against a
//! logging backend, then simulates a pointer hover to show the picking
//! protocol and the selection uniform at work.

use seamark_core::{AttributeRule, Feature};
use seamark_gpu::{
    standard_uniforms, FeatureProbe, FrameOrchestrator, FrameState, PassDescriptor, PassKind,
    RenderBackend, SelectionRegister, ShaderPair, UniformValue,
};

fn main() {
    env_logger::init();

    println!("Seamark Vessel Rendering Demo");
    println!("=============================\n");

    let fleet = demo_fleet();
    let selection = SelectionRegister::new();
    let orchestrator = demo_orchestrator(selection.clone());
    let mut backend = LoggingBackend;

    // A frame centered mid-fleet at 10 m/px on a 800x600 viewport
    let frame = FrameState::new([1000.0, 500.0], 10.0, 0.0, [800, 600]);
    orchestrator
        .render_frame(&mut backend, &fleet, &frame)
        .expect("frame should render");

    // Hover over the second vessel
    let probe = NearestProbe {
        fleet: &fleet,
        frame,
    };
    let picked = orchestrator
        .pointer_move(&mut backend, &probe, &fleet, &frame, [400.0, 300.0])
        .expect("pick should succeed");

    match picked {
        Some(hit) => {
            println!("\nhovering {}:", hit.feature_ref);
            let mut keys: Vec<_> = hit.properties.keys().collect();
            keys.sort();
            for key in keys {
                println!("  {key}: {:?}", hit.properties[key.as_str()]);
            }
            println!("selection register now holds {}", selection.get());
        }
        None => println!("\nnothing under the pointer"),
    }
}

fn demo_fleet() -> Vec<Feature> {
    vec![
        Feature::new("ais.101", [400.0, 250.0])
            .with_property("name", "PELICAN")
            .with_property("sog", 0.2)
            .with_property("cog", 0.0),
        Feature::new("ais.102", [1000.0, 500.0])
            .with_property("name", "EVER GIVEN")
            .with_property("sog", 12.4)
            .with_property("cog", 45.0),
        Feature::new("ais.103", [1800.0, 900.0])
            .with_property("name", "TERNHOLM")
            .with_property("sog", 7.1)
            .with_property("cog", 270.0),
    ]
}

/// The standard vessel attribute set: marker size, moored-vessel flag,
/// hit-encoded identifier, and heading decomposed for the vertex shader.
fn vessel_attributes() -> Vec<AttributeRule> {
    vec![
        AttributeRule::new("size", |_f: &Feature| Ok(30.0)).per_vertex_only(),
        AttributeRule::new("iscircle", |f: &Feature| Ok(f.number("sog")? < 0.5))
            .to_fragment(),
        AttributeRule::new("id", |f: &Feature| {
            Ok(seamark_core::encode_id(f.feature_ref()?.index))
        })
        .to_fragment(),
        AttributeRule::new("cosangle", |f: &Feature| {
            Ok(f.number("cog")?.to_radians().cos())
        }),
        AttributeRule::new("sinangle", |f: &Feature| {
            Ok(f.number("cog")?.to_radians().sin())
        }),
    ]
}

fn demo_orchestrator(selection: SelectionRegister) -> FrameOrchestrator {
    let visible = PassDescriptor::new(
        vessel_attributes(),
        standard_uniforms(selection.clone()),
        ShaderPair::new("// vessel vertex shader", "// vessel fragment shader"),
    );
    let hit = PassDescriptor::new(
        vessel_attributes(),
        standard_uniforms(selection.clone()),
        ShaderPair::new("// hit vertex shader", "// hit fragment shader"),
    );
    FrameOrchestrator::new(visible, hit, selection)
}

/// Stand-in upload surface that narrates what a GPU backend would receive.
struct LoggingBackend;

impl RenderBackend for LoggingBackend {
    fn upload_attributes(
        &mut self,
        pass: PassKind,
        names: &[&str],
        buffer: &[f32],
    ) -> anyhow::Result<()> {
        let stride = 2 + names.len();
        println!(
            "[{}] upload: {} instances x {} floats ({:?})",
            pass.label(),
            buffer.len() / stride,
            stride,
            names
        );
        Ok(())
    }

    fn set_uniforms(
        &mut self,
        pass: PassKind,
        uniforms: &[(&str, UniformValue)],
    ) -> anyhow::Result<()> {
        for (name, value) in uniforms {
            println!("[{}] uniform {name} = {value:?}", pass.label());
        }
        Ok(())
    }

    fn draw(&mut self, pass: PassKind, feature_count: usize) -> anyhow::Result<()> {
        println!("[{}] draw {} markers", pass.label(), feature_count);
        Ok(())
    }
}

/// Geometric feature-at-pixel probe: nearest marker within its radius,
/// checked in reverse draw order so the topmost marker wins.
struct NearestProbe<'a> {
    fleet: &'a [Feature],
    frame: FrameState,
}

impl FeatureProbe for NearestProbe<'_> {
    fn first_feature_at(&self, pixel: [f64; 2]) -> Option<&Feature> {
        let half = [
            self.frame.size[0] as f64 / 2.0,
            self.frame.size[1] as f64 / 2.0,
        ];
        let world = [
            self.frame.center[0] + (pixel[0] - half[0]) * self.frame.resolution,
            self.frame.center[1] - (pixel[1] - half[1]) * self.frame.resolution,
        ];
        let radius_world = 15.0 * self.frame.resolution;
        self.fleet.iter().rev().find(|feature| {
            let [x, y] = feature.geometry();
            let (dx, dy) = (x - world[0], y - world[1]);
            (dx * dx + dy * dy).sqrt() <= radius_world
        })
    }
}
