/// Timing knobs of the playback engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// How long a key is held down, and how long all keys stay up before the
    /// next one goes down. Hosts drop keystrokes that are shorter than a few
    /// milliseconds.
    pub down_time_ms: u32,
    /// Wait between arming a script and the first tick of its playback. At
    /// boot this gives the host time to enumerate the keyboard.
    pub arm_delay_ms: u32,
}

impl Config {
    pub const DEFAULT: Config = Config {
        down_time_ms: 10,
        arm_delay_ms: 2000,
    };
}

impl Default for Config {
    fn default() -> Self {
        Config::DEFAULT
    }
}
