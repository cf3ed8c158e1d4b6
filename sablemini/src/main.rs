use clap::Parser;
use libsablemini::{CommandLineArgs, SableError, Server, ServerOptions};
use std::net::TcpListener;
use tracing::info;

fn main() -> Result<(), SableError> {
    let args = CommandLineArgs::parse();
    let mut options = if let Some(config_file) = &args.config {
        ServerOptions::from_config(config_file.clone())?
    } else {
        ServerOptions::default()
    };
    options.apply_command_line_args(&args);

    // configure our tracing subscriber
    let fmtr = tracing_subscriber::fmt::fmt()
        .with_thread_names(true)
        .with_thread_ids(true)
        .with_max_level(options.general_settings.log_level);

    if let Some(logdir) = &options.general_settings.logdir {
        fmtr.with_writer(tracing_appender::rolling::hourly(logdir, "sablemini.log"))
            .with_ansi(false)
            .init();
    } else {
        fmtr.init();
    }

    // install our custom panic! handler
    std::panic::set_hook(Box::new(|e| {
        let errmsg = format!("{}", e);
        for line in errmsg.split('\n') {
            tracing::error!("{}", line);
        }
    }));

    info!("Server configuration:\n{:#?}", options);
    let address = options.general_settings.public_address.clone();

    let server = Server::new(options)?;

    let listener = TcpListener::bind(&address)?;
    info!("Server started on address: {}", address);

    let server_state = server.state();
    let _ = ctrlc::set_handler(move || {
        info!("Received Ctrl-C");
        server_state.shutdown();
        info!("Bye");
        std::process::exit(0);
    });

    server.accept_loop(listener);
    Ok(())
}
