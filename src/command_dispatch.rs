//! Purpose: Hold top-level CLI command dispatch for `herodex`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Command behavior, output envelopes, and exit code semantics stay unchanged.
//! Invariants: Helpers in `main.rs` remain the source of output formatting.

use super::*;

pub(super) fn dispatch_command(
    command: Command,
    asset: AssetRef,
    color_mode: ColorMode,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "herodex", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::List { json } => {
            let store = load_store(&asset)?;
            emit_heroes(&store.list(), json);
            Ok(RunOutcome::ok())
        }
        Command::Show { id, json } => {
            ensure_hero_id(&id)?;
            let store = load_store(&asset)?;
            match store.find_by_id(&id) {
                Some(hero) => emit_hero(&hero, json),
                None => {
                    // The detail view redirects to the list on a miss
                    // instead of failing.
                    emit_notice(&redirect_notice(&id), color_mode);
                    emit_heroes(&store.list(), json);
                }
            }
            Ok(RunOutcome::ok())
        }
        Command::Add(args) => {
            let json = args.json;
            let mut store = load_store(&asset)?;
            let hero = store.add(args.into_hero());
            emit_hero(&hero, json);
            Ok(RunOutcome::ok())
        }
        Command::Edit(args) => {
            ensure_hero_id(&args.id)?;
            let mut store = load_store(&asset)?;
            let current = store.find_by_id(&args.id).ok_or_else(|| {
                Error::new(ErrorKind::NotFound)
                    .with_message("hero not found")
                    .with_id(args.id.clone())
                    .with_hint("Run `herodex list` to see the known ids.")
            })?;
            let json = args.json;
            let updated = store.update_checked(args.apply_to(current))?;
            emit_hero(&updated, json);
            Ok(RunOutcome::ok())
        }
        Command::Delete { id, yes } => {
            ensure_hero_id(&id)?;
            confirm_delete(&id, yes)?;
            let mut store = load_store(&asset)?;
            let deleted = store.delete_by_id(&id);
            emit_json(json!({ "deleted": deleted, "id": id }));
            Ok(RunOutcome::ok())
        }
        Command::Search { query, json } => {
            let store = load_store(&asset)?;
            emit_heroes(&store.suggest(&query), json);
            Ok(RunOutcome::ok())
        }
        Command::Serve(args) => {
            let config = serve_config_from_args(args, asset)?;
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to start runtime")
                        .with_source(err)
                })?;
            runtime.block_on(serve::serve(config))?;
            Ok(RunOutcome::ok())
        }
    }
}
