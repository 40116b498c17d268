use std::panic;

use clap::Parser;
use cli::Cli;
use cpython_dist::cancel::{self, CancelToken};
use cpython_dist::do_compile;
use miette::Diagnostic;
use thiserror::Error;

mod cli;

fn report_error(error: &miette::Report) {
    eprintln!("ERROR: {error:?}");
}

fn main() {
    let cli = Cli::parse();
    // Init the logger
    tracing_subscriber::fmt::fmt()
        .with_max_level(cli.verbose)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .with_ansi(console::colors_enabled_stderr())
        .init();

    // Control how errors are formatted by setting the miette hook.
    miette::set_hook(Box::new(move |_| {
        let graphical_theme = if console::colors_enabled_stderr() {
            miette::GraphicalTheme::unicode()
        } else {
            miette::GraphicalTheme::unicode_nocolor()
        };
        Box::new(
            miette::MietteHandlerOpts::new()
                .graphical_theme(graphical_theme)
                .build(),
        )
    }))
    .expect("failed to initialize error handler");

    // Now that miette is set up, use it to format panics.
    panic::set_hook(Box::new(move |panic_info| {
        let payload = panic_info.payload();
        let message = if let Some(msg) = payload.downcast_ref::<&str>() {
            msg
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            &msg[..]
        } else {
            "something went wrong"
        };

        #[derive(Debug, Error, Diagnostic)]
        #[error("{message}")]
        pub struct PanicError {
            pub message: String,
            #[help]
            pub help: Option<String>,
        }

        report_error(
            &miette::Report::from(PanicError {
                message: message.to_owned(),
                help: panic_info
                    .location()
                    .map(|loc| format!("at {}:{}:{}", loc.file(), loc.line(), loc.column())),
            })
            .wrap_err("cpython-dist panicked"),
        );
    }));

    // The pipeline itself is synchronous; the runtime exists for the http
    // clients and for the signal watcher that flips the cancel token.
    let runtime = tokio::runtime::Runtime::new().expect("failed to start tokio runtime");
    let cancel = CancelToken::new();
    runtime.spawn(cancel::watch_signals(cancel.clone()));

    let cfg = cli.to_config();
    if let Err(e) = do_compile(&cfg, &cancel, runtime.handle()) {
        report_error(&miette::Report::new(e));
        std::process::exit(1);
    }
}
