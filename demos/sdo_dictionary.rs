use std::error::Error;
use coimage::{
    LoopbackMaster, LinkConfig, MasterLink,
    ObjectDescriptor, ServiceDataBinding, Access, Mapping,
    ErrorKind,
    };
use bilge::prelude::*;

/// control parameters of a remote-driven mobile base
#[bitsize(32)]
#[derive(FromBits, DebugBits, Copy, Clone)]
struct ControlParam {
    standby_direction: u2,
    reserved: u2,
    emergency: bool,
    reserved: u2,
    recovery: bool,
    remote_direction: u2,
    remote_active: bool,
    reserved: u1,
    max_speed: u16,
    reserved: u4,
}
coimage::bilge_pdodata!(ControlParam, u32);

const SLAVE: u16 = 1;
const DRIVING_OFFSET: ObjectDescriptor<i32> = ObjectDescriptor::bounded(
    0x0005, 0x02, Access::ReadOnly, Mapping::MAPPED,
    -10_000, 10_000, 0);

fn control_param() -> ObjectDescriptor<ControlParam> {
    ObjectDescriptor::bounded(
        0x0005, 0x01, Access::ReadOnly, Mapping::MAPPED,
        ControlParam::from(0), ControlParam::from(u32::MAX), ControlParam::from(0))
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let control_param = control_param();

    let master = LoopbackMaster::new(LinkConfig::default())?;
    // simulated content of the slave dictionary
    let param = ControlParam::new(u2::new(1), true, false, u2::new(2), true, 1200);
    master.insert_sdo(SLAVE, control_param.index(), control_param.sub(), &u32::from(param).to_le_bytes());
    master.insert_sdo(SLAVE, DRIVING_OFFSET.index(), DRIVING_OFFSET.sub(), &(-250i32).to_le_bytes());

    let control = ServiceDataBinding::new(&master, SLAVE, &control_param);
    let offset = ServiceDataBinding::new(&master, SLAVE, &DRIVING_OFFSET);
    println!("control: {:?}", control.read()?);
    println!("driving offset: {} (in {} .. {})", offset.read()?, DRIVING_OFFSET.min(), DRIVING_OFFSET.max());

    // read-only is only informative, the slave decides
    offset.write(300)?;
    println!("driving offset: {}", offset.read()?);

    // the steering offset is not in the slave dictionary
    let steering = ServiceDataBinding::<i32, _>::at(&master, SLAVE, 0x0005, 0x03);
    match steering.read() {
        Err(error) if error.kind() == ErrorKind::Protocol => println!("steering offset: {}", error),
        other => println!("unexpected answer: {:?}", other),
    }

    master.on_master_event(0, "dictionary dump done");
    Ok(())
}
