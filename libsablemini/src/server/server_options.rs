use crate::{ini_read_prop, ini_usize, SableError};
use clap::Parser;
use ini::Ini;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct GeneralSettings {
    /// Clients are connecting to this address
    pub public_address: String,
    /// Server workers count. set to 0 to let sablemini decide
    pub workers: usize,
    /// Log level
    pub log_level: tracing::Level,
    /// Log directory. If set to `None`, logs are written into `stdout`
    /// sablemini uses an hourly rotating logs
    pub logdir: Option<PathBuf>,
    /// Number of logical databases (`SELECT 0` .. `SELECT databases - 1`)
    pub databases: usize,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        GeneralSettings {
            public_address: "127.0.0.1:6379".to_string(),
            workers: 0,
            log_level: tracing::Level::INFO,
            logdir: None,
            databases: 16,
        }
    }
}

/// Allow user to override configuration file parameters by passing them directly in the command line
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "sablemini", about = "An in-memory server speaking the Redis protocol")]
pub struct CommandLineArgs {
    /// Path to an INI configuration file
    pub config: Option<String>,

    #[arg(long)]
    /// Public address used by clients
    pub public_address: Option<String>,

    #[arg(long)]
    /// Log verbosity (can be one of: info, warn, error, trace, debug)
    pub log_level: Option<String>,

    #[arg(long)]
    /// Directory for the (hourly rotated) log files
    pub logdir: Option<String>,

    #[arg(short, long)]
    /// Server workers count. set to 0 to let sablemini decide which defaults to `(number of CPUs / 2)`
    pub workers: Option<usize>,

    #[arg(short, long)]
    /// Number of logical databases
    pub databases: Option<usize>,
}

#[derive(Default, Debug, Clone)]
pub struct ServerOptions {
    pub general_settings: GeneralSettings,
}

impl ServerOptions {
    /// Override values read from the configuration file from the command line
    pub fn apply_command_line_args(&mut self, cli_args: &CommandLineArgs) {
        if let Some(public_address) = &cli_args.public_address {
            self.general_settings.public_address = public_address.to_string();
        }

        if let Some(log_level) = &cli_args.log_level {
            if let Ok(log_level) = tracing::Level::from_str(log_level) {
                self.general_settings.log_level = log_level;
            }
        }

        if let Some(logdir) = &cli_args.logdir {
            self.general_settings.logdir = Some(PathBuf::from(logdir));
        }

        if let Some(workers) = &cli_args.workers {
            self.general_settings.workers = *workers;
        }

        if let Some(databases) = &cli_args.databases {
            self.general_settings.databases = (*databases).max(1);
        }
    }

    /// Read values from INI configuration file and return `ServerOptions` structure
    pub fn from_config(config_file: String) -> Result<Self, SableError> {
        let ini_file = Ini::load_from_file(config_file)?;
        Self::from_ini(&ini_file)
    }

    /// Parse an INI document held in memory
    pub fn from_ini_str(content: &str) -> Result<Self, SableError> {
        let ini_file = Ini::load_from_str(content).map_err(ini::Error::Parse)?;
        Self::from_ini(&ini_file)
    }

    fn from_ini(ini_file: &Ini) -> Result<Self, SableError> {
        let mut options = ServerOptions::default();

        // [general] section
        Self::read_string(
            ini_file,
            "general",
            "public_address",
            &mut options.general_settings.public_address,
        )?;
        Self::read_usize(
            ini_file,
            "general",
            "workers",
            &mut options.general_settings.workers,
        )?;
        Self::read_usize(
            ini_file,
            "general",
            "databases",
            &mut options.general_settings.databases,
        )?;
        if options.general_settings.databases == 0 {
            return Err(SableError::InvalidArgument(
                "`databases` must be greater than 0".to_string(),
            ));
        }
        Self::read_log_level(
            ini_file,
            "general",
            "log_level",
            &mut options.general_settings.log_level,
        )?;
        Self::read_path(
            ini_file,
            "general",
            "logdir",
            &mut options.general_settings.logdir,
        )?;
        Ok(options)
    }

    /// The number of workers to start: the configured value, or half of the
    /// available CPUs (at least 1) when set to 0
    pub fn workers_count(&self) -> usize {
        match self.general_settings.workers {
            0 => {
                let cpus = std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(2);
                (cpus / 2).max(1)
            }
            count => count,
        }
    }

    /// =========-------------------------------------
    /// Helper methods
    /// =========-------------------------------------

    fn read_usize(
        ini_file: &Ini,
        section_name: &str,
        directive_name: &str,
        target: &mut usize,
    ) -> Result<(), SableError> {
        let val = ini_read_prop!(ini_file, section_name, directive_name);
        *target = ini_usize!(val);
        Ok(())
    }

    fn read_string(
        ini_file: &Ini,
        section_name: &str,
        directive_name: &str,
        target: &mut String,
    ) -> Result<(), SableError> {
        let val = ini_read_prop!(ini_file, section_name, directive_name);
        *target = val.to_string();
        Ok(())
    }

    fn read_path(
        ini_file: &Ini,
        section_name: &str,
        directive_name: &str,
        target: &mut Option<PathBuf>,
    ) -> Result<(), SableError> {
        let val = ini_read_prop!(ini_file, section_name, directive_name);
        *target = Some(PathBuf::from(val));
        Ok(())
    }

    fn read_log_level(
        ini_file: &Ini,
        section_name: &str,
        directive_name: &str,
        target: &mut tracing::Level,
    ) -> Result<(), SableError> {
        let val = ini_read_prop!(ini_file, section_name, directive_name);
        let Ok(level) = tracing::Level::from_str(val) else {
            return Err(SableError::InvalidArgument(format!(
                "invalid log level `{}`",
                val
            )));
        };
        *target = level;
        Ok(())
    }
}
