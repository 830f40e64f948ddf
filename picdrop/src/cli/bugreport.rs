use bugreport::{
    bugreport,
    collector::{CompileTimeInformation, EnvironmentVariables, OperatingSystem, SoftwareVersion},
    format::Markdown,
};

pub fn run() {
    bugreport!()
        .info(SoftwareVersion::default())
        .info(OperatingSystem::default())
        .info(EnvironmentVariables::list(&[
            "SHELL",
            "TERM",
            "RUST_LOG",
            "PICDROP_DATA_DIR",
            "PICDROP_STATIC_DIR",
            "PICDROP_PORT",
            "PICDROP_NOTIFY",
        ]))
        .info(CompileTimeInformation::default())
        .print::<Markdown>();
}
