/*!
    In-process master driver, wiring the output image back into the input image.

    [LoopbackMaster] implements [MasterLink] without any hardware: each cycle copies what the application wrote to the outputs into the inputs, and its SDO exchanges address an in-memory dictionary. This is the way to run applications and tests without a segment.

    ```
    use coimage::*;
    use std::time::Duration;

    let master = std::sync::Arc::new(LoopbackMaster::new(LinkConfig::default()
        .input_size(8)
        .output_size(8))?);
    let cycle = master.spawn(Duration::from_millis(1));

    master.write_mapped(Direction::Output, 0, 0x1234u16);
    assert!(master.wait_cycles(2, Duration::from_secs(1)));
    assert_eq!(master.read_mapped::<u16>(Direction::Input, 0), 0x1234);
    drop(cycle);
    # Ok::<(), MasterError>(())
    ```
*/

use core::{
    sync::atomic::{AtomicBool, Ordering::*},
    time::Duration,
    };
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    thread::{self, JoinHandle},
    time::Instant,
    };
use crate::{
    cycle::CycleCounter,
    error::{MasterError, MasterResult},
    image::{ProcessImage, ImageAccess},
    link::{MasterLink, INVALID_SLAVE_ID, DEFAULT_CYCLE_TIMEOUT},
    notify::Hub,
    sdo::SdoAbortCode,
    };


/**
    settings of a master link, to be given at its creation

    ```
    use coimage::LinkConfig;
    use std::time::Duration;

    let config = LinkConfig::default()
        .input_size(32)
        .output_size(16)
        .cycle_timeout(Duration::from_millis(10));
    assert_eq!(config.get_input_size(), 32);
    ```
*/
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LinkConfig {
    input_size: usize,
    output_size: usize,
    image_access: ImageAccess,
    thread_safe_hub: bool,
    cycle_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            input_size: 0,
            output_size: 0,
            image_access: ImageAccess::Exclusive,
            thread_safe_hub: true,
            cycle_timeout: DEFAULT_CYCLE_TIMEOUT,
        }
    }
}

impl LinkConfig {
    /// byte size of the input process image
    pub fn input_size(self, input_size: usize) -> Self  {Self {input_size, .. self}}
    /// byte size of the output process image
    pub fn output_size(self, output_size: usize) -> Self  {Self {output_size, .. self}}
    /// duration waited for by [LoopbackMaster::wait_default]
    pub fn cycle_timeout(self, cycle_timeout: Duration) -> Self  {Self {cycle_timeout, .. self}}
    /**
        disable any locking in the process images and the hub

        # Safety

        the link created with this config must only be used by one thread at a time, the cycle thread included
    */
    pub unsafe fn unsynchronized(self) -> Self {
        Self {image_access: ImageAccess::Unsynchronized, thread_safe_hub: false, .. self}
    }

    pub fn get_input_size(&self) -> usize  {self.input_size}
    pub fn get_output_size(&self) -> usize  {self.output_size}
    pub fn get_image_access(&self) -> ImageAccess  {self.image_access}
    pub fn get_thread_safe_hub(&self) -> bool  {self.thread_safe_hub}
    pub fn get_cycle_timeout(&self) -> Duration  {self.cycle_timeout}
}


/// key of an entry in the simulated dictionaries: slave, index, subindex
type EntryAddress = (u16, u16, u8);

/**
    master link whose outputs are looped back to its inputs at each cycle

    the slaves' dictionaries are simulated by a map of byte strings, filled with [Self::insert_sdo]. Only existing entries can be written, and only with their current length.
*/
#[derive(Debug)]
pub struct LoopbackMaster {
    config: LinkConfig,
    input: ProcessImage,
    output: ProcessImage,
    hub: Hub,
    cycles: CycleCounter,
    dictionary: Mutex<HashMap<EntryAddress, Vec<u8>>>,
}

impl LoopbackMaster {
    pub fn new(config: LinkConfig) -> MasterResult<Self> {
        let (input, output) = match config.image_access {
            ImageAccess::Exclusive => (
                ProcessImage::new(config.input_size)?,
                ProcessImage::new(config.output_size)?,
                ),
            // memory safety: only reachable through the unsafe config setter
            ImageAccess::Unsynchronized => unsafe {(
                ProcessImage::unsynchronized(config.input_size)?,
                ProcessImage::unsynchronized(config.output_size)?,
                )},
        };
        let hub = match config.thread_safe_hub {
            true => Hub::new(),
            false => unsafe {Hub::unsynchronized()},
        };
        log::info!("loopback master created with {} input bytes and {} output bytes", config.input_size, config.output_size);
        Ok(Self {
            config,
            input,
            output,
            hub,
            cycles: CycleCounter::new(),
            dictionary: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &LinkConfig  {&self.config}
    /// counter of the cycles applied so far, also allowing async waits
    pub fn cycles(&self) -> &CycleCounter  {&self.cycles}

    /// wait for one cycle with the timeout of the config
    pub fn wait_default(&self) -> bool {
        self.wait_cycles(1, self.config.cycle_timeout)
    }

    /// create or replace an entry in the dictionary of a simulated slave
    pub fn insert_sdo(&self, slave: u16, index: u16, sub: u8, value: &[u8]) {
        self.dictionary().insert((slave, index, sub), value.to_vec());
    }
    /// remove an entry from the dictionary of a simulated slave, returning its value if it existed
    pub fn remove_sdo(&self, slave: u16, index: u16, sub: u8) -> Option<Vec<u8>> {
        self.dictionary().remove(&(slave, index, sub))
    }

    /**
        run cycles with the given period on the current thread, until `stop` is set

        cycles that cannot be completed in time are skipped rather than accumulated
    */
    pub fn run(&self, period: Duration, stop: &AtomicBool) {
        let mut next = Instant::now();
        while ! stop.load(Relaxed) {
            next += period;
            let now = Instant::now();
            if next > now
                {thread::sleep(next - now)}
            else
                {next = now}
            self.on_cycle_sync();
        }
    }
    /**
        run cycles with the given period on a new thread

        the thread priority is raised if allowed, and the thread stops when the returned handle is dropped
    */
    pub fn spawn(self: &Arc<Self>, period: Duration) -> CycleThread {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let master = self.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                raise_priority();
                master.run(period, &stop);
            })
        };
        log::debug!("cycle thread started with period {:?}", period);
        CycleThread {stop, handle: Some(handle)}
    }

    fn dictionary(&self) -> std::sync::MutexGuard<'_, HashMap<EntryAddress, Vec<u8>>> {
        self.dictionary.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(target_os = "linux")]
fn raise_priority() {
    if let Err(err) = thread_priority::set_current_thread_priority(thread_priority::ThreadPriority::Max) {
        log::warn!("cannot raise the cycle thread priority: {:?}", err);
    }
}
#[cfg(not(target_os = "linux"))]
fn raise_priority() {}

impl MasterLink for LoopbackMaster {
    fn input(&self) -> &ProcessImage  {&self.input}
    fn output(&self) -> &ProcessImage  {&self.output}
    fn hub(&self) -> &Hub  {&self.hub}

    fn wait_cycles(&self, cycles: u32, timeout: Duration) -> bool {
        self.cycles.wait(cycles, timeout)
    }

    fn read_sdo_raw(&self, slave: u16, index: u16, sub: u8, dst: &mut [u8]) -> MasterResult<usize> {
        if slave == INVALID_SLAVE_ID
            {return Err(MasterError::invalid_argument("invalid slave id"))}
        let dictionary = self.dictionary();
        let value = dictionary.get(&(slave, index, sub))
            .ok_or_else(|| MasterError::abort(SdoAbortCode::InvalidIndex))?;
        if value.len() != dst.len()
            {return Err(MasterError::abort(SdoAbortCode::InvalidLength))}
        dst.copy_from_slice(value);
        Ok(value.len())
    }
    fn write_sdo_raw(&self, slave: u16, index: u16, sub: u8, src: &[u8]) -> MasterResult<usize> {
        if slave == INVALID_SLAVE_ID
            {return Err(MasterError::invalid_argument("invalid slave id"))}
        let mut dictionary = self.dictionary();
        let value = dictionary.get_mut(&(slave, index, sub))
            .ok_or_else(|| MasterError::abort(SdoAbortCode::InvalidIndex))?;
        if value.len() != src.len()
            {return Err(MasterError::abort(SdoAbortCode::InvalidLength))}
        value.copy_from_slice(src);
        Ok(src.len())
    }

    /// copy the output image into the input image, then count the cycle
    fn apply_cycle(&self) {
        self.output.inspect(|output| self.input.update(|input| {
            let len = input.len().min(output.len());
            input[.. len].copy_from_slice(&output[.. len]);
        }));
        self.cycles.advance();
    }
}


/// handle on a thread running the cycles of a [LoopbackMaster], stopping it on drop
#[derive(Debug)]
pub struct CycleThread {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}
impl CycleThread {
    /// stop the cycles and wait for the thread to terminate
    pub fn stop(mut self) -> MasterResult {
        self.terminate()
    }
    fn terminate(&mut self) -> MasterResult {
        self.stop.store(true, Relaxed);
        match self.handle.take().map(JoinHandle::join) {
            Some(Err(_)) => Err(MasterError::critical("cycle thread panicked")),
            _ => Ok(()),
        }
    }
}
impl Drop for CycleThread {
    fn drop(&mut self) {
        // errors were already logged on creation
        let _ = self.terminate();
    }
}
