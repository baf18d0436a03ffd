#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex, atomic::{AtomicUsize, Ordering::*}},
        time::Duration,
        };
    use coimage::*;
    use bilge::prelude::*;
    use futures_concurrency::future::Join;

    #[bitsize(16)]
    #[derive(FromBits, DebugBits, Copy, Clone)]
    struct StatusWord {
        ready_to_switch_on: bool,
        switched_on: bool,
        operation_enabled: bool,
        fault: bool,
        reserved: u12,
    }
    coimage::bilge_pdodata!(StatusWord, u16);

    /// operation mode whose byte encoding has no zero value
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    enum Mode {
        Position = 1,
        Velocity = 3,
    }
    impl PdoData for Mode {
        const TYPE: TypeCode = TypeCode::Unsigned8;
        type Packed = [u8; 1];

        fn pack(&self, dst: &mut [u8]) -> PackingResult<()> {
            (*self as u8).pack(dst)
        }
        fn unpack(src: &[u8]) -> PackingResult<Self> {
            match u8::unpack(src)? {
                1 => Ok(Mode::Position),
                3 => Ok(Mode::Velocity),
                _ => Err(PackingError::InvalidValue("unknown mode")),
            }
        }
        fn fallback() -> Self  {Mode::Position}
    }

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn master(input: usize, output: usize) -> LoopbackMaster {
        init();
        LoopbackMaster::new(LinkConfig::default().input_size(input).output_size(output)).unwrap()
    }

    #[test]
    fn cycle_notifications() {
        let master = master(4, 4);
        let calls = Arc::new(Mutex::new(Vec::new()));
        let subscribers = ["first", "second"].map(|name| {
            let calls = calls.clone();
            Subscriber::new(move |_: &CycleCompleted| calls.lock().unwrap().push(name))
        });
        for subscriber in &subscribers {master.hub().attach(subscriber)}

        master.on_cycle_sync();
        assert_eq!(*calls.lock().unwrap(), ["first", "second"]);

        assert!(master.hub().detach(&subscribers[0]));
        master.on_cycle_sync();
        assert_eq!(*calls.lock().unwrap(), ["first", "second", "second"]);
    }

    #[test]
    fn master_events() {
        let master = master(0, 0);
        let received = Arc::new(Mutex::new(None));
        let subscriber = Subscriber::new({
            let received = received.clone();
            move |event: &MasterEvent| *received.lock().unwrap() = Some((event.code(), event.message().to_owned()))
            });
        master.hub().attach(&subscriber);
        // cycle events are not delivered to master event subscribers
        master.on_cycle_sync();
        assert_eq!(*received.lock().unwrap(), None);

        master.on_master_event(0x8210, "slave 2 left operational state");
        assert_eq!(*received.lock().unwrap(), Some((0x8210, "slave 2 left operational state".to_owned())));
    }

    #[test]
    fn little_endian_image() {
        let master = master(4, 4);
        let binding = ProcessDataBinding::<u32, _>::new(&master, Direction::Output, 0);
        assert_eq!(binding.write(0x01020304), 32);

        let mut raw = [0; 4];
        assert_eq!(master.output().read(&mut raw, 0, 32), 32);
        assert_eq!(raw, [0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn typed_round_trips() {
        let master = master(0, 64);
        let image = master.output();
        assert_eq!(master.write_pdo(image, 0, -5i8), 8);
        assert_eq!(master.write_pdo(image, 8, 0xabcdu16), 16);
        assert_eq!(master.write_pdo(image, 24, -70_000i32), 32);
        assert_eq!(master.write_pdo(image, 56, 1.25f32), 32);
        assert_eq!(master.write_pdo(image, 88, -2.5e-3f64), 64);
        assert_eq!(master.write_pdo(image, 152, u64::MAX - 1), 64);
        assert_eq!(master.write_pdo(image, 216, *b"coimage"), 56);

        assert_eq!(master.read_pdo::<i8>(image, 0), -5);
        assert_eq!(master.read_pdo::<u16>(image, 8), 0xabcd);
        assert_eq!(master.read_pdo::<i32>(image, 24), -70_000);
        assert_eq!(master.read_pdo::<f32>(image, 56), 1.25);
        assert_eq!(master.read_pdo::<f64>(image, 88), -2.5e-3);
        assert_eq!(master.read_pdo::<u64>(image, 152), u64::MAX - 1);
        assert_eq!(&master.read_pdo::<[u8; 7]>(image, 216), b"coimage");
    }

    #[test]
    fn boolean_requests_one_bit() {
        let master = master(2, 2);
        // a single bit is never a byte-sized transfer, whatever the offset
        assert_eq!(master.write_mapped(Direction::Output, 0, true), 0);
        assert_eq!(master.write_mapped(Direction::Output, 8, true), 0);
        master.output().inspect(|data| assert_eq!(data, &[0, 0]));

        master.output().write(&[1, 1], 0, 16);
        assert!(! master.read_mapped::<bool>(Direction::Output, 0));
        let flag = ProcessDataBinding::<bool, _>::new(&master, Direction::Output, 8);
        assert!(! flag.read());

        // banks of flags are bound with raw fields instead
        let flags = RawBinding::new(&master, Direction::Output, 0, 16).unwrap();
        assert_eq!(flags.read(), 0x0101);
    }

    #[test]
    fn bitfield_words() {
        let master = master(2, 2);
        let status = ProcessDataBinding::<StatusWord, _>::new(&master, Direction::Input, 0);
        assert_eq!(<StatusWord as PdoData>::BITS, 16);

        master.write_mapped(Direction::Output, 0, StatusWord::new(true, true, false, true));
        master.on_cycle_sync();
        let word = status.read();
        assert!(word.ready_to_switch_on() && word.switched_on() && word.fault());
        assert!(! word.operation_enabled());
        assert_eq!(master.read_mapped::<u16>(Direction::Input, 0), 0b1011);
    }

    #[test]
    fn invalid_bytes_read_as_fallback() {
        let master = master(2, 2);
        let mode = ProcessDataBinding::<Mode, _>::new(&master, Direction::Input, 0);
        // a fresh image only holds zeros
        assert_eq!(mode.read(), Mode::Position);
        // out of the image
        assert_eq!(master.read_mapped::<Mode>(Direction::Input, 16), Mode::Position);

        assert_eq!(master.write_mapped(Direction::Output, 0, Mode::Velocity), 8);
        master.on_cycle_sync();
        assert_eq!(mode.read(), Mode::Velocity);

        master.output().write(&[7], 0, 8);
        master.on_cycle_sync();
        assert_eq!(mode.read(), Mode::Position);
    }

    #[test]
    fn service_data() {
        let master = master(0, 0);
        master.insert_sdo(1, 0x6060, 0, &[1]);
        let descriptor = ObjectDescriptor::<i8>::bounded(0x6060, 0, Access::ReadWrite, Mapping::NONE, -4, 10, 0);
        let mode = ServiceDataBinding::new(&master, 1, &descriptor);
        assert_eq!(mode.read().unwrap(), 1);
        // bounds are not enforced
        assert_eq!(mode.write(42).unwrap(), 8);
        assert_eq!(mode.read().unwrap(), 42);
        assert_eq!(mode.descriptor().max(), 10);

        let other_slave = ServiceDataBinding::new(&master, 2, &descriptor);
        let error = other_slave.read().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Protocol);
        assert_eq!(error.code(), Some(i64::from(u32::from(SdoAbortCode::InvalidIndex))));
    }

    #[test]
    fn dynamic_link() {
        let master = master(8, 8);
        let link: &dyn MasterLink = &master;
        let binding = ProcessDataBinding::<u16, _>::new(link, Direction::Output, 48);
        assert_eq!(binding.write(0x55aa), 16);
        link.on_cycle_sync();
        assert_eq!(link.read_mapped::<u16>(Direction::Input, 48), 0x55aa);
    }

    #[test]
    fn cycle_thread() {
        let master = Arc::new(master(4, 4));
        let count = Arc::new(AtomicUsize::new(0));
        let subscriber = Subscriber::new({
            let count = count.clone();
            move |_: &CycleCompleted| {count.fetch_add(1, Relaxed);}
            });
        master.hub().attach(&subscriber);
        assert!(! master.wait_default());

        let cycle = master.spawn(Duration::from_millis(1));
        let counter = ProcessDataBinding::<u32, _>::new(&*master, Direction::Output, 0);
        let echo = ProcessDataBinding::<u32, _>::new(&*master, Direction::Input, 0);
        for i in 1 .. 10 {
            counter.write(i);
            assert!(master.wait_cycles(2, Duration::from_secs(5)));
            assert_eq!(echo.read(), i);
        }
        drop(cycle);
        assert!(count.load(Relaxed) >= 18);
    }

    #[tokio::test]
    async fn async_cycle_wait() {
        let master = Arc::new(master(4, 4));
        let cycles = async {
            for _ in 0 .. 3 {
                tokio::time::sleep(Duration::from_millis(1)).await;
                master.on_cycle_sync();
            }
        };
        let ((), reached) = (
            cycles,
            master.cycles().wait_async(3, Duration::from_secs(5)),
            ).join().await;
        assert!(reached);
        assert!(! master.cycles().wait_async(1, Duration::from_millis(10)).await);
    }
}
