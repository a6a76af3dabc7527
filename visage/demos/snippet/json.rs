use visage::pause;
use visage::render::RenderTarget;
use visage::scheduler::Scheduler;

#[derive(Debug)]
struct Console;

impl RenderTarget for Console {
    fn apply_au(&self, id: u32, value: f64, _: Option<f64>) {
        println!("AU{:<3} -> {:.2}", id, value);
    }
    fn set_viseme(&self, index: usize, value: f64, jaw_scale: f64) {
        println!("viseme#{:<2} -> {:.2} (jaw x{})", index, value, jaw_scale);
    }
}

const SPEECH: &str = r#"{
    "name": "hello",
    "snippetCategory": "combined",
    "snippetJawScale": 0.8,
    "curves": {
        "aa": [{"time": 0, "intensity": 0}, {"time": 0.15, "intensity": 90}, {"time": 0.3, "intensity": 0}],
        "E":  [{"time": 0.3, "intensity": 0}, {"time": 0.45, "intensity": 70}, {"time": 0.6, "intensity": 0}],
        "12": [{"time": 0, "intensity": 0}, {"time": 0.6, "intensity": 0.4}]
    }
}"#;

#[visage::runtime]
async fn main() {
    let scheduler = Scheduler::new(Console);
    let name = scheduler.load_from_json(SPEECH);

    // Scrub back and forth while paused: values apply immediately.
    scheduler.pause();
    for time in [0.15, 0.45, 0.0] {
        scheduler.seek(&name, time);
        pause!(100);
    }

    scheduler.play();
    pause!(1000);
    println!("{:#?}", scheduler.get_schedule_snapshot());
}
