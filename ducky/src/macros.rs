// Logging that works on the target (defmt), on the target without a logger
// (compiled away) and on the host under `cargo test` (stderr). Only the `{}`
// and `{:?}` placeholders are used so the same call sites suit all three.

#[allow(unused)]
#[macro_use]
#[cfg(all(not(test), not(feature = "defmt")))]
mod no_defmt {
    macro_rules! debug {
        ($($arg:expr),*) => {{ let _ = ($($arg),*); }};
    }

    macro_rules! info {
        ($($arg:expr),*) => {{ let _ = ($($arg),*); }};
    }

    macro_rules! warn {
        ($($arg:expr),*) => {{ let _ = ($($arg),*); }};
    }

    macro_rules! error {
        ($($arg:expr),*) => {{ let _ = ($($arg),*); }};
    }
}

#[allow(unused)]
#[macro_use]
#[cfg(all(not(test), feature = "defmt"))]
mod with_defmt {
    macro_rules! debug {
        ($($arg:expr),*) => {
            defmt::debug!($($arg,)*)
        };
    }

    macro_rules! info {
        ($($arg:expr),*) => {
            defmt::info!($($arg,)*)
        };
    }

    macro_rules! warn {
        ($($arg:expr),*) => {
            defmt::warn!($($arg,)*)
        };
    }

    macro_rules! error {
        ($($arg:expr),*) => {
            defmt::error!($($arg,)*)
        };
    }
}
