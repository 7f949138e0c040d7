use clap::Parser;
use env_logger::Env;

use levantamento_cargas::auth::{self, UserRegistry, Verification};
use levantamento_cargas::cli::{self, Cli, Commands, ConfigAction, TemplateAction, UsersAction};
use levantamento_cargas::config::{Config, SmtpConfig, StoreBackend};
use levantamento_cargas::email::Mailer;
use levantamento_cargas::error::{LevantamentoError, Result};
use levantamento_cargas::photos;
use levantamento_cargas::session::SessionState;
use levantamento_cargas::store::{JsonFileStore, RecordStore, XlsxStore};
use levantamento_cargas::template::TemplateStore;

use levantamento_common::{FieldKind, Schema};
use sha2::{Digest, Sha256};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::init_from_env(Env::default().default_filter_or(default_level));

    let config = Config::load()?;

    match cli.command {
        Commands::Analyze { template, json } => {
            println!("🔍 levantamento - análise de modelo\n");

            let bytes = std::fs::read(&template)?;
            let schema = levantamento_common::analyze(&bytes)?;

            if json {
                println!("{}", schema.to_json()?);
            } else {
                print_schema(&schema);
            }
        }

        Commands::Sample { output, legacy } => {
            println!("📋 levantamento - modelo de demonstração\n");

            let bytes = if legacy {
                levantamento_common::sample_template_legacy()?
            } else {
                levantamento_common::sample_template()?
            };
            std::fs::write(&output, bytes)?;
            println!("✔ modelo gravado: {}", output.display());
        }

        Commands::Add {
            user,
            uc,
            tipo,
            campos,
            fotos,
        } => {
            println!("📝 levantamento - novo registro\n");

            let data_dir = config.data_dir()?;
            let templates = TemplateStore::new(&data_dir);

            // 1. Modelo ativo
            println!("[1/3] carregando o modelo ativo...");
            let (bytes, origin) = templates.active_template_for(&user)?;
            let mut session = SessionState::new(&user);
            session.set_template(bytes, origin)?;
            println!("✔ modelo {origin}\n");

            // 2. Validação das respostas
            println!("[2/3] conferindo os campos...");
            let fields = cli::parse_field_assignments(&campos)?;
            {
                let schema = session.schema().ok_or(LevantamentoError::MissingTemplate)?;
                let Some(sheet) = schema.sheet(&tipo) else {
                    println!("Tipos disponíveis: {}", schema.equipment_types().join(", "));
                    return Err(
                        levantamento_common::Error::EquipmentTypeMismatch(tipo).into()
                    );
                };
                cli::validate_field_values(sheet, &fields)?;
            }
            let photo_refs = photos::attach_photos(&fotos)?;
            println!("✔ {} campo(s), {} foto(s)\n", fields.len(), photo_refs.len());

            // 3. Gravação
            println!("[3/3] gravando...");
            let mut store = open_store(&config)?;
            session.load_from(store.as_ref())?;
            let id = session.add_record(store.as_mut(), &uc, &tipo, fields, photo_refs)?;
            println!("✔ registro {id} criado ({} no total)", session.records().len());

            println!("\n✅ concluído");
        }

        Commands::List { user, uc } => {
            println!("📒 levantamento - registros de {user}\n");

            let store = open_store(&config)?;
            let records = store.load(&user)?;
            let mut shown = 0;
            for (i, record) in records.iter().enumerate() {
                if let Some(code) = &uc {
                    if &record.installation_code != code {
                        continue;
                    }
                }
                shown += 1;
                println!(
                    "{:>3}. UC {} | {} | {} | {} campo(s), {} foto(s)",
                    i + 1,
                    record.installation_code,
                    record.equipment_type,
                    record.recorded_at,
                    record.fields.len(),
                    record.photos.len()
                );
            }

            if shown == 0 {
                println!("Nenhum levantamento.");
            } else {
                println!("\n{shown} levantamento(s)");
            }
        }

        Commands::Remove {
            user,
            index,
            uc,
            all,
        } => {
            println!("🗑 levantamento - remoção\n");

            let data_dir = config.data_dir()?;
            let mut store = open_store(&config)?;
            let mut session = SessionState::new(&user);
            session.load_from(store.as_ref())?;

            if let Some(position) = index {
                if position == 0 {
                    return Err(LevantamentoError::CliExecution(
                        "a posição mostrada em `list` começa em 1".to_string(),
                    ));
                }
                let removed = session.remove_record(store.as_mut(), position - 1)?;
                println!(
                    "✔ removido: UC {} | {} ({})",
                    removed.installation_code, removed.equipment_type, removed.id
                );
            } else if let Some(code) = uc {
                admin_registry(&data_dir)?;
                let removed = session.remove_by_installation(store.as_mut(), &code)?;
                println!("✔ {removed} levantamento(s) da UC {code} removido(s)");
            } else if all {
                admin_registry(&data_dir)?;
                let removed = session.clear_records(store.as_mut())?;
                println!("✔ {removed} levantamento(s) removido(s)");
            } else {
                return Err(LevantamentoError::CliExecution(
                    "informe --index, --uc ou --all".to_string(),
                ));
            }
        }

        Commands::Export {
            user,
            output,
            zip,
            email,
        } => {
            println!("📦 levantamento - exportação\n");

            let data_dir = config.data_dir()?;
            let templates = TemplateStore::new(&data_dir);

            // 1. Entradas
            println!("[1/3] carregando modelo e registros...");
            let (template_bytes, origin) = templates.active_template_for(&user)?;
            let store = open_store(&config)?;
            let records = store.load(&user)?;
            println!("✔ modelo {origin}, {} levantamento(s)\n", records.len());

            if records.is_empty() {
                return Err(LevantamentoError::CliExecution(
                    "nenhum levantamento para exportar".to_string(),
                ));
            }

            // 2. Montagem
            println!("[2/3] montando {}...", if zip { "o pacote" } else { "a planilha" });
            let payload = if zip {
                let outcome = levantamento_common::assemble_archive(&template_bytes, &records)?;
                println!(
                    "✔ {} registro(s) na planilha, {} foto(s) no pacote",
                    outcome.appended, outcome.photos_included
                );
                if outcome.skipped > 0 {
                    println!(
                        "⚠ {} registro(s) pulado(s): sem aba para {}",
                        outcome.skipped,
                        outcome.skipped_types.join(", ")
                    );
                }
                if outcome.photos_missing > 0 {
                    println!("⚠ {} foto(s) não encontrada(s) no disco", outcome.photos_missing);
                }
                outcome.bytes
            } else {
                let outcome = levantamento_common::export(&template_bytes, &records)?;
                println!("✔ {} registro(s)", outcome.appended);
                if outcome.skipped > 0 {
                    println!(
                        "⚠ {} registro(s) pulado(s): sem aba para {}",
                        outcome.skipped,
                        outcome.skipped_types.join(", ")
                    );
                }
                outcome.bytes
            };
            println!();

            // 3. Saída
            println!("[3/3] gravando {}...", output.display());
            std::fs::write(&output, &payload)?;
            println!("✔ arquivo gravado");

            if let Some(address) = email {
                println!("\nEnviando por e-mail...");
                let mailer = Mailer::from_config(config.smtp()?)?;
                let file_name = output
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "levantamento.xlsx".to_string());
                mailer.send_export(&address, &file_name, &payload)?;
                println!("✔ enviado para {address}");
            }

            println!("\n✅ exportação concluída");
        }

        Commands::Template { action } => {
            let data_dir = config.data_dir()?;
            let templates = TemplateStore::new(&data_dir);

            match action {
                TemplateAction::Show { user } => {
                    println!("📐 levantamento - modelos\n");
                    match user {
                        Some(user) => {
                            let (bytes, origin) = templates.active_template_for(&user)?;
                            let schema = levantamento_common::analyze(&bytes)?;
                            println!("Modelo ativo de {user}: {origin}");
                            println!("  digest: {}", hex::encode(Sha256::digest(&bytes)));
                            println!("  abas: {}", schema.equipment_types().join(", "));
                        }
                        None => {
                            if templates.has_default() {
                                let bytes = templates.default_template()?;
                                let schema = levantamento_common::analyze(&bytes)?;
                                println!("Modelo padrão:");
                                println!("  digest: {}", hex::encode(Sha256::digest(&bytes)));
                                println!("  abas: {}", schema.equipment_types().join(", "));
                            } else {
                                println!("Nenhum modelo padrão gravado.");
                            }
                        }
                    }
                }

                TemplateAction::SetDefault { file } => {
                    println!("📐 levantamento - modelo padrão\n");
                    admin_registry(&data_dir)?;
                    let bytes = std::fs::read(&file)?;
                    // Análise no upload: modelo quebrado não entra.
                    let schema = levantamento_common::analyze(&bytes)?;
                    templates.replace_default(&bytes)?;
                    println!(
                        "✔ modelo padrão substituído ({} aba(s): {})",
                        schema.sheets.len(),
                        schema.equipment_types().join(", ")
                    );
                }

                TemplateAction::SetPersonal { user, file } => {
                    println!("📐 levantamento - modelo pessoal\n");
                    let bytes = std::fs::read(&file)?;
                    let schema = levantamento_common::analyze(&bytes)?;
                    templates.store_personal(&user, &bytes)?;
                    println!(
                        "✔ modelo pessoal de {user} gravado ({} aba(s))",
                        schema.sheets.len()
                    );
                }

                TemplateAction::ResetPersonal { user } => {
                    println!("📐 levantamento - modelo pessoal\n");
                    if templates.remove_personal(&user)? {
                        println!("✔ modelo pessoal de {user} removido; vale o padrão");
                    } else {
                        println!("{user} não tinha modelo pessoal.");
                    }
                }
            }
        }

        Commands::Users { action } => {
            println!("👤 levantamento - usuários\n");

            let data_dir = config.data_dir()?;
            let mut registry = admin_registry(&data_dir)?;

            match action {
                UsersAction::Add { name } => {
                    let password = prompt_new_password(&name)?;
                    registry.register(&name, &password)?;
                    println!("✔ usuário {name} cadastrado");
                }

                UsersAction::Remove { name } => {
                    registry.remove(&name)?;
                    println!("✔ usuário {name} removido");
                }

                UsersAction::Passwd { name } => {
                    let password = prompt_new_password(&name)?;
                    registry.change_password(&name, &password)?;
                    println!("✔ senha de {name} trocada");
                }
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("Configuração ({}):", Config::config_path()?.display());
                println!("  diretório de dados: {}", config.data_dir()?.display());
                println!(
                    "  armazenamento: {}",
                    match config.store {
                        StoreBackend::Json => "json (um arquivo por usuário)",
                        StoreBackend::Xlsx => "xlsx (planilha compartilhada)",
                    }
                );
                match &config.smtp {
                    Some(smtp) => println!("  smtp: {}@{}:{}", smtp.user, smtp.host, smtp.port),
                    None => println!("  smtp: não configurado"),
                }
            }

            ConfigAction::Init => {
                let path = Config::config_path()?;
                if path.exists() {
                    println!("Já existe configuração em {}", path.display());
                } else {
                    let example = Config {
                        data_dir: None,
                        store: StoreBackend::Json,
                        smtp: Some(SmtpConfig {
                            host: "smtp.exemplo.com.br".to_string(),
                            port: 465,
                            user: "levantamentos".to_string(),
                            password: "troque-aqui".to_string(),
                            from: "Levantamentos <levantamentos@exemplo.com.br>".to_string(),
                            tls_implicit: true,
                        }),
                    };
                    example.save()?;
                    println!("✔ configuração de exemplo gravada em {}", path.display());
                }
            }
        },
    }

    Ok(())
}

fn open_store(config: &Config) -> Result<Box<dyn RecordStore>> {
    let dir = config.data_dir()?;
    Ok(match config.store {
        StoreBackend::Json => Box::new(JsonFileStore::new(&dir)),
        StoreBackend::Xlsx => Box::new(XlsxStore::new(dir.join("levantamentos.xlsx"))),
    })
}

/// Pede a senha do Admin no terminal e retorna o registro aberto.
/// Senha legada aceita é regravada como hash na hora.
fn admin_registry(data_dir: &Path) -> Result<UserRegistry> {
    let mut registry = UserRegistry::open(data_dir)?;
    let password = dialoguer::Password::new()
        .with_prompt("Senha do Admin")
        .interact()
        .map_err(|e| LevantamentoError::CliExecution(e.to_string()))?;

    match registry.verify(auth::DEFAULT_ADMIN, &password) {
        Verification::Valid { needs_rehash } => {
            if needs_rehash {
                registry.rehash(auth::DEFAULT_ADMIN, &password)?;
            }
            Ok(registry)
        }
        Verification::Invalid => Err(LevantamentoError::Auth(
            "senha do Admin incorreta".to_string(),
        )),
    }
}

fn prompt_new_password(name: &str) -> Result<String> {
    dialoguer::Password::new()
        .with_prompt(format!("Nova senha de {name}"))
        .with_confirmation("Confirme a senha", "As senhas não conferem")
        .interact()
        .map_err(|e| LevantamentoError::CliExecution(e.to_string()))
}

fn print_schema(schema: &Schema) {
    for sheet in &schema.sheets {
        println!("Aba: {}", sheet.name);
        for field in &sheet.fields {
            match field.kind {
                FieldKind::Text => println!("  {}: texto livre", field.name),
                FieldKind::Choice => {
                    println!("  {}: seleção [{}]", field.name, field.choices.join(", "))
                }
            }
        }
        println!();
    }
}
