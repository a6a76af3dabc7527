use visage::animations::{Keyframe, Snippet};
use visage::pause;
use visage::render::RenderTarget;
use visage::scheduler::Scheduler;

#[derive(Debug)]
struct Console;

impl RenderTarget for Console {
    fn apply_au(&self, id: u32, value: f64, _: Option<f64>) {
        println!("AU{:<3} -> {:.2}", id, value);
    }
}

#[visage::runtime]
async fn main() {
    let scheduler = Scheduler::new(Console);

    // AU45: blink.
    scheduler.load(Snippet::new("blink").with_curve(
        "45",
        vec![
            Keyframe::new(0.0, 0.0),
            Keyframe::new(0.08, 1.0),
            Keyframe::new(0.2, 0.0),
        ],
    ));

    pause!(500);
    println!("{}", scheduler.state());
}
