//! Mechanism for loading and sharing the monitoring configuration
//!
//! The configuration file holds one `key value` item per line. Everything
//! after the key is the value, lists are comma-separated, and text values may
//! be surrounded by double quotes. Blank lines and `#` comments are ignored.

use crate::{
    monitor::MonitorConfig,
    numeric::Float,
    trigger::TriggerFlagConfig,
    Result,
};
use eyre::{bail, ensure, Report, WrapErr};
use log::info;
use std::{collections::HashSet, fs, str::FromStr};

/// Run configuration
#[derive(Clone, Debug, PartialEq)]
pub struct Configuration {
    /// Number of events to be generated
    pub num_events: usize,

    /// Seed of the random number generator
    pub seed: u64,

    /// Number of the simulated run
    pub run_number: u32,

    /// Probability for a generated event to have a broken hemisphere
    /// collection (empty or with an invalid size)
    pub bad_hemisphere_rate: Float,

    /// Configuration of the razor monitor
    pub monitor: MonitorConfig,
}
//
impl Default for Configuration {
    fn default() -> Self {
        Self {
            num_events: 100_000,
            seed: 12345,
            run_number: 1,
            bad_hemisphere_rate: 0.01,
            monitor: MonitorConfig::default(),
        }
    }
}
//
impl Configuration {
    /// Load the configuration from a file, check it, and print it out
    pub fn load(file_name: &str) -> Result<Self> {
        // Read out the configuration file or die trying
        let config_str = fs::read_to_string(file_name)
            .wrap_err_with(|| format!("Could not read {}", file_name))?;

        // Decode and check it
        let config = Self::parse(&config_str)?;

        // Display it, which eases comparisons between runs
        config.print();
        Ok(config)
    }

    /// Decode and check the contents of a configuration file
    pub fn parse(config_str: &str) -> Result<Self> {
        let mut config = Self::default();
        let mut seen_keys = HashSet::new();

        for (line_idx, line) in config_str.lines().enumerate() {
            // Drop comments and blank lines
            let line = line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }

            // Split the key from the value
            let (key, data) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
            let item = ConfigItem::new(key, data.trim());
            ensure!(
                seen_keys.insert(key.to_owned()),
                "Configuration of {} is repeated on line {}",
                key,
                line_idx + 1
            );
            config
                .set(item)
                .wrap_err_with(|| format!("Bad configuration on line {}", line_idx + 1))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the field designated by a configuration item
    fn set(&mut self, item: ConfigItem) -> Result<()> {
        let mon = &mut self.monitor;
        match item.name {
            "num_events" => self.num_events = item.parse()?,
            "seed" => self.seed = item.parse()?,
            "run" => self.run_number = item.parse()?,
            "badHemisphereRate" => self.bad_hemisphere_rate = item.parse()?,
            "FolderName" => mon.folder_name = item.text(),
            "met" => mon.met_tag = item.text(),
            "jets" => mon.jets_tag = item.text(),
            "hemispheres" => mon.hemispheres_tag = item.text(),
            "metSelection" => mon.met_selection = item.text(),
            "jetSelection" => mon.jet_selection = item.text(),
            "njets" => mon.njets = item.parse()?,
            "rsqCut" => mon.rsq_cut = item.parse()?,
            "mrCut" => mon.mr_cut = item.parse()?,
            "mrBins" => mon.binning.mr = item.parse_list()?,
            "rsqBins" => mon.binning.rsq = item.parse_list()?,
            "dphiRBins" => mon.binning.dphi_r = item.parse_list()?,
            name => {
                // Trigger flags use a "num." or "den." prefix
                let (flag, key) = match name.split_once('.') {
                    Some(("num", key)) => (&mut mon.num_trigger, key),
                    Some(("den", key)) => (&mut mon.den_trigger, key),
                    _ => bail!("Unknown configuration item {}", name),
                };
                set_trigger_flag(flag, key, item)?;
            }
        }
        Ok(())
    }

    /// Check that the configuration makes sense
    pub fn validate(&self) -> Result<()> {
        ensure!(self.num_events > 0, "Please process at least one event");
        ensure!(
            (0. ..=1.).contains(&self.bad_hemisphere_rate),
            "The bad hemisphere rate must be a probability"
        );
        self.monitor.validate()
    }

    /// Display the configuration
    pub fn print(&self) {
        let mon = &self.monitor;
        info!("num_events        : {}", self.num_events);
        info!("seed              : {}", self.seed);
        info!("run               : {}", self.run_number);
        info!("badHemisphereRate : {}", self.bad_hemisphere_rate);
        info!("FolderName        : {}", mon.folder_name);
        info!("met               : {}", mon.met_tag);
        info!("jets              : {}", mon.jets_tag);
        info!("hemispheres       : {}", mon.hemispheres_tag);
        info!("metSelection      : {:?}", mon.met_selection);
        info!("jetSelection      : {:?}", mon.jet_selection);
        info!("njets             : {}", mon.njets);
        info!("rsqCut            : {}", mon.rsq_cut);
        info!("mrCut             : {}", mon.mr_cut);
        info!("mrBins            : {:?}", mon.binning.mr);
        info!("rsqBins           : {:?}", mon.binning.rsq);
        info!("dphiRBins         : {:?}", mon.binning.dphi_r);
        for (prefix, flag) in [("num", &mon.num_trigger), ("den", &mon.den_trigger)] {
            info!("{}.dcsPartitions : {:?}", prefix, flag.dcs_partitions);
            info!("{}.hltInputTag   : {}", prefix, flag.hlt_input_tag);
            info!("{}.hltPaths      : {:?}", prefix, flag.hlt_paths);
        }
    }
}

/// Set a field of a trigger flag configuration
fn set_trigger_flag(flag: &mut TriggerFlagConfig, key: &str, item: ConfigItem) -> Result<()> {
    match key {
        "andOr" => flag.and_or = item.parse_bool()?,
        "dcsInputTag" => flag.dcs_input_tag = item.text(),
        "dcsPartitions" => flag.dcs_partitions = item.parse_list()?,
        "andOrDcs" => flag.and_or_dcs = item.parse_bool()?,
        "errorReplyDcs" => flag.error_reply_dcs = item.parse_bool()?,
        "dbLabel" => flag.db_label = item.text(),
        "andOrHlt" => flag.and_or_hlt = item.parse_bool()?,
        "hltInputTag" => flag.hlt_input_tag = item.text(),
        "hltPaths" => flag.hlt_paths = item.parse_list()?,
        "hltDBKey" => flag.hlt_db_key = item.text(),
        "errorReplyHlt" => flag.error_reply_hlt = item.parse_bool()?,
        "verbosityLevel" => flag.verbosity_level = item.parse()?,
        _ => bail!("Unknown configuration item {}", item.name),
    }
    Ok(())
}

/// A value from the configuration file, tagged with the name of the item
/// which it belongs to for error reporting purposes.
struct ConfigItem<'data> {
    name: &'data str,
    data: &'data str,
}
//
impl<'data> ConfigItem<'data> {
    /// Build a config item from its name and raw data
    fn new(name: &'data str, data: &'data str) -> Self {
        Self { name, data }
    }

    /// Raw text, without surrounding quotes
    fn text(&self) -> String {
        unquote(self.data).to_owned()
    }

    /// Parse this data using Rust's standard parsing logic
    fn parse<T: FromStr>(&self) -> Result<T>
    where
        <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
    {
        parse_value(self.name, unquote(self.data))
    }

    /// Parse booleans, also accepting the numeric forms 0 and 1
    fn parse_bool(&self) -> Result<bool> {
        match unquote(self.data).to_lowercase().as_str() {
            "1" => Ok(true),
            "0" => Ok(false),
            _ => self.parse::<bool>(),
        }
    }

    /// Parse a comma-separated list, where an empty value is an empty list
    fn parse_list<T: FromStr>(&self) -> Result<Vec<T>>
    where
        <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
    {
        let data = unquote(self.data);
        if data.is_empty() {
            return Ok(Vec::new());
        }
        data.split(',')
            .map(|elem| parse_value(self.name, unquote(elem.trim())))
            .collect()
    }
}

/// Parse a single value, reporting which configuration item it belongs to
fn parse_value<T: FromStr>(name: &str, data: &str) -> Result<T>
where
    <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    data.parse::<T>()
        .map_err(Report::new)
        .wrap_err_with(|| format!("Could not parse configuration of {} ({:?})", name, data))
}

/// Remove the double quotes around a value, if any
fn unquote(data: &str) -> &str {
    data.strip_prefix('"')
        .and_then(|d| d.strip_suffix('"'))
        .unwrap_or(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Configuration::parse("# nothing to see here\n\n").unwrap();
        assert_eq!(config, Configuration::default());
    }

    #[test]
    fn items_are_decoded() {
        let config = Configuration::parse(
            r#"
            num_events   5000
            seed         42
            FolderName   HLT/SUSY/RazorHbb
            jetSelection "pt > 40 && abs(eta) < 3.0"  # central jets
            njets        1
            rsqCut       0.25
            dphiRBins    0, 1.6, 3.2
            num.hltPaths HLT_RsqMR270_Rsq0p09_MR200_v*, HLT_RsqMR300_Rsq0p09_MR200_v*
            den.hltPaths "HLT_Ele27_WPTight_Gsf_v*"
            den.andOrHlt 0
            den.dcsPartitions 24, 25
            "#,
        )
        .unwrap();
        assert_eq!(config.num_events, 5000);
        assert_eq!(config.seed, 42);
        let mon = &config.monitor;
        assert_eq!(mon.folder_name, "HLT/SUSY/RazorHbb");
        assert_eq!(mon.jet_selection, "pt > 40 && abs(eta) < 3.0");
        assert_eq!(mon.njets, 1);
        assert_eq!(mon.rsq_cut, 0.25);
        assert_eq!(mon.mr_cut, 300.);
        assert_eq!(mon.binning.dphi_r, vec![0., 1.6, 3.2]);
        assert_eq!(mon.num_trigger.hlt_paths.len(), 2);
        assert_eq!(mon.den_trigger.hlt_paths, vec!["HLT_Ele27_WPTight_Gsf_v*"]);
        assert!(!mon.den_trigger.and_or_hlt);
        assert_eq!(mon.den_trigger.dcs_partitions, vec![24, 25]);
    }

    #[test]
    fn bad_files_are_rejected() {
        for bad in [
            "nevents 10",
            "num.hltPathz HLT_A_v1",
            "njets -1",
            "njets 2\nnjets 3",
            "num_events 0",
            "mrBins 0, 300, 200",
            "rsqBins 0.5",
            "metSelection pt >",
            "den.andOrHlt maybe",
        ] {
            assert!(Configuration::parse(bad).is_err(), "{:?} was accepted", bad);
        }
    }
}
