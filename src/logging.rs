//! Logging macros
//!
//! - `esp32` feature: printed over UART0 through `esp-println`
//! - Host unit tests: `println!`
//! - Anything else: compiled out (arguments are still type-checked)
//!
//! Never log from the tick path; these are for normal-context code only.

macro_rules! log_info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "esp32")]
        ::esp_println::println!("[INFO] {}", format_args!($($arg)*));

        #[cfg(all(not(feature = "esp32"), test))]
        ::std::println!("[INFO] {}", format_args!($($arg)*));

        #[cfg(all(not(feature = "esp32"), not(test)))]
        {
            let _ = format_args!($($arg)*);
        }
    }};
}

macro_rules! log_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "esp32")]
        ::esp_println::println!("[WARN] {}", format_args!($($arg)*));

        #[cfg(all(not(feature = "esp32"), test))]
        ::std::println!("[WARN] {}", format_args!($($arg)*));

        #[cfg(all(not(feature = "esp32"), not(test)))]
        {
            let _ = format_args!($($arg)*);
        }
    }};
}

macro_rules! log_debug {
    ($($arg:tt)*) => {{
        #[cfg(all(feature = "esp32", debug_assertions))]
        ::esp_println::println!("[DEBUG] {}", format_args!($($arg)*));

        #[cfg(all(not(feature = "esp32"), test))]
        ::std::println!("[DEBUG] {}", format_args!($($arg)*));

        #[cfg(not(any(all(feature = "esp32", debug_assertions), test)))]
        {
            let _ = format_args!($($arg)*);
        }
    }};
}
