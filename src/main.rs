#![no_std]
#![no_main]

use core::cell::{Cell, RefCell};
use core::sync::atomic::{AtomicU32, Ordering};

use critical_section::Mutex;
use embedded_hal::delay::DelayNs;
use esp_backtrace as _;
use esp_bootloader_esp_idf::esp_app_desc;
use esp_hal::{
    delay::Delay,
    gpio::{Level, Output, OutputConfig},
    xtensa_lx_rt::entry,
};
use isr_timer::{
    esp32::{Esp32TickSource, TickPriority},
    tick_source, IsrTimer, TimerId, TICK_FREQUENCY_HZ,
};

esp_app_desc!(); // defaults are fine

static TIMERS: IsrTimer = IsrTimer::new();

static LED: Mutex<RefCell<Option<Output<'static>>>> = Mutex::new(RefCell::new(None));
static HEARTBEAT: Mutex<Cell<Option<TimerId>>> = Mutex::new(Cell::new(None));
static BEATS: AtomicU32 = AtomicU32::new(0);

fn tick() {
    TIMERS.on_tick();
}

fn blink() {
    critical_section::with(|cs| {
        if let Some(led) = LED.borrow_ref_mut(cs).as_mut() {
            led.toggle();
        }
    });
}

fn heartbeat(step: usize) {
    BEATS.fetch_add(step as u32, Ordering::Relaxed);
}

fn stop_heartbeat() {
    if let Some(id) = critical_section::with(|cs| HEARTBEAT.borrow(cs).get()) {
        if let Err(err) = TIMERS.disable(id) {
            esp_println::println!("Heartbeat not stopped: {}", err);
        }
    }
}

#[entry]
fn main() -> ! {
    let peripherals = esp_hal::init(esp_hal::Config::default());
    esp_println::println!("Initializing ISR timers...");

    let led = Output::new(peripherals.GPIO2, Level::Low, OutputConfig::default());
    critical_section::with(|cs| LED.borrow_ref_mut(cs).replace(led));

    if let Err(err) = TIMERS.set_interval_ms(500, blink) {
        esp_println::println!("LED timer not created: {}", err);
    }

    match TIMERS.create_ms(
        2_000,
        isr_timer::Runs::Forever,
        isr_timer::Callback::WithArg(heartbeat, 1),
    ) {
        Ok(id) => critical_section::with(|cs| HEARTBEAT.borrow(cs).set(Some(id))),
        Err(err) => esp_println::println!("Heartbeat timer not created: {}", err),
    }

    if let Err(err) = TIMERS.set_timeout_ms(10_000, stop_heartbeat) {
        esp_println::println!("Timeout not created: {}", err);
    }

    let mut source = match Esp32TickSource::new(peripherals.TIMG0) {
        Ok(source) => source.with_priority(TickPriority::Level2),
        Err(err) => panic!("Tick source unavailable: {}", err),
    };
    if let Err(err) = tick_source::attach(&mut source, TICK_FREQUENCY_HZ, tick) {
        panic!("Tick source failed to start: {}", err);
    }

    esp_println::println!(
        "{} of {} timers in use",
        TIMERS.num_timers(),
        TIMERS.capacity()
    );

    let mut delay = Delay::new();
    loop {
        delay.delay_ms(1_000);
        esp_println::println!(
            "beats={} timers={} free={}",
            BEATS.load(Ordering::Relaxed),
            TIMERS.num_timers(),
            TIMERS.num_available_timers()
        );
    }
}
