use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "sonoshape",
    about = "Live audio analysis feeding sound categories, haptic patterns and visual parameters"
)]
pub struct Cli {
    /// List available input devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Input device name (defaults to the last used device)
    #[arg(short, long)]
    pub device: Option<String>,

    /// Analyze a synthetic tone at this frequency instead of a device
    #[arg(long)]
    pub tone: Option<f32>,

    /// Sample rate of the synthetic tone
    #[arg(long, default_value_t = 48000.0)]
    pub tone_sample_rate: f32,

    /// Post this classifier label once per second (stands in for a model)
    #[arg(long)]
    pub label: Option<String>,

    /// Confidence reported with --label
    #[arg(long, default_value_t = 0.9)]
    pub label_confidence: f64,

    /// Tick rate in Hz (overrides the config file)
    #[arg(long)]
    pub tick_rate: Option<f32>,

    /// Stop after this many seconds (runs until interrupted otherwise)
    #[arg(long)]
    pub duration: Option<f32>,

    /// Seconds between snapshot log lines
    #[arg(long, default_value_t = 1.0)]
    pub report_every: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tone_run() {
        let cli = Cli::try_parse_from([
            "sonoshape",
            "--tone",
            "440",
            "--tick-rate",
            "60",
            "--duration",
            "2.5",
        ])
        .unwrap();
        assert_eq!(cli.tone, Some(440.0));
        assert_eq!(cli.tick_rate, Some(60.0));
        assert_eq!(cli.duration, Some(2.5));
        assert!(cli.device.is_none());
        assert!(!cli.list_devices);
    }

    #[test]
    fn defaults_leave_overrides_unset() {
        let cli = Cli::try_parse_from(["sonoshape"]).unwrap();
        assert!(cli.tick_rate.is_none());
        assert_eq!(cli.tone_sample_rate, 48000.0);
        assert_eq!(cli.report_every, 1.0);
    }
}
