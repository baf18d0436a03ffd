use std::{
    sync::{Arc, atomic::{AtomicBool, AtomicU64, Ordering::*}},
    time::Duration,
    };
use futures_concurrency::future::Join;
use coimage::{
    LoopbackMaster, LinkConfig, MasterLink, MasterResult,
    ProcessDataBinding, RawBinding, Direction,
    Subscriber, CycleCompleted, MasterEvent,
    };

const PERIOD: Duration = Duration::from_millis(1);

#[tokio::main]
async fn main() -> MasterResult {
    env_logger::init();

    let master = Arc::new(LoopbackMaster::new(LinkConfig::default()
        .input_size(8)
        .output_size(8))?);

    let cycles = Arc::new(AtomicU64::new(0));
    let on_cycle = Subscriber::new({
        let cycles = cycles.clone();
        move |_: &CycleCompleted| {cycles.fetch_add(1, Relaxed);}
        });
    let on_event = Subscriber::new(|event: &MasterEvent| println!("master event {}: {}", event.code(), event.message()));
    master.hub().attach(&on_cycle);
    master.hub().attach(&on_event);

    let cycle = master.spawn(PERIOD);

    // outputs come back in the inputs at the next cycle
    let target = ProcessDataBinding::<i32, _>::new(&*master, Direction::Output, 0);
    let position = ProcessDataBinding::<i32, _>::new(&*master, Direction::Input, 0);
    let flags = RawBinding::new(&*master, Direction::Output, 32, 16)?;
    let done = AtomicBool::new(false);

    (
        async {
            for step in 0 .. 10 {
                target.write(step * 100);
                flags.write(1 << step);
                master.cycles().wait_async(2, PERIOD * 10).await;
            }
            done.store(true, Relaxed);
        },
        async {
            while ! done.load(Relaxed) && master.cycles().wait_async(1, PERIOD * 10).await {
                if master.cycles().count() % 4 == 0
                    {println!("position {}", position.read())}
            }
        },
    ).join().await;

    master.on_master_event(1, "demo finished");
    cycle.stop()?;
    println!("{} cycles notified", cycles.load(Relaxed));
    Ok(())
}
