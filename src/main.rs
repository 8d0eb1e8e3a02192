use gantt_rs_renderer::PlanError;

fn main() {
    if let Err(err) = gantt_rs_renderer::run() {
        eprintln!("error: {err}");
        let code = err
            .downcast_ref::<PlanError>()
            .map_or(1, PlanError::exit_code);
        std::process::exit(code);
    }
}
