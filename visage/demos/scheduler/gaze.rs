use visage::animations::{Keyframe, Snippet};
use visage::pause;
use visage::render::{RenderTarget, TransitionHandle, Tween};
use visage::scheduler::{Scheduler, SnippetEvent};

/// A rig driving eye and head rotations as signed continuum values.
#[derive(Debug)]
struct Rig;

impl RenderTarget for Rig {
    fn apply_au(&self, id: u32, value: f64, _: Option<f64>) {
        println!("AU{:<3} -> {:.2}", id, value);
    }
    fn supports_continuum(&self) -> bool {
        true
    }
    fn transition_continuum(&self, neg: u32, pos: u32, value: f64, duration_ms: u64) -> TransitionHandle {
        Tween::new(0.0, value, duration_ms).run(move |value| {
            println!("AU{}/AU{} -> {:+.2}", neg, pos, value);
        })
    }
}

#[visage::runtime]
async fn main() {
    let scheduler = Scheduler::new(Rig);
    scheduler.on("looped", |event: SnippetEvent| println!("{:?}", event));

    // Look left (AU61) then right (AU62), forever.
    scheduler.load(
        Snippet::new("gaze")
            .set_loop(true)
            .with_curve("61", vec![Keyframe::new(0.0, 0.0), Keyframe::new(0.5, 0.6), Keyframe::new(1.0, 0.0)])
            .with_curve("62", vec![Keyframe::new(1.0, 0.0), Keyframe::new(1.5, 0.6), Keyframe::new(2.0, 0.0)]),
    );

    pause!(4500);
    scheduler.stop();
}
