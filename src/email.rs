//! Envio da exportação por e-mail
//!
//! Conexão SMTP única por envio, sem fila nem nova tentativa: falhou,
//! o erro sobe e o arquivo continua no disco para reenvio manual.

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Message, SmtpTransport, Transport};
use log::info;

use crate::config::SmtpConfig;
use crate::error::{LevantamentoError, Result};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub struct Mailer {
    smtp: SmtpTransport,
    from: String,
}

impl Mailer {
    pub fn from_config(config: &SmtpConfig) -> Result<Self> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());
        let tls_parameters = TlsParameters::new(config.host.clone()).map_err(email_err)?;
        let tls = if config.tls_implicit {
            Tls::Wrapper(tls_parameters)
        } else {
            Tls::Required(tls_parameters)
        };

        let smtp = SmtpTransport::relay(&config.host)
            .map_err(email_err)?
            .credentials(creds)
            .port(config.port)
            .tls(tls)
            .build();

        Ok(Mailer {
            smtp,
            from: config.from.clone(),
        })
    }

    /// Envia o arquivo exportado como anexo para um destinatário.
    pub fn send_export(&self, to: &str, file_name: &str, payload: &[u8]) -> Result<()> {
        let content_type =
            ContentType::parse(attachment_content_type(file_name)).map_err(email_err)?;
        let attachment =
            Attachment::new(file_name.to_string()).body(payload.to_vec(), content_type);
        let body = SinglePart::builder().header(ContentType::TEXT_PLAIN).body(format!(
            "Segue em anexo a exportação dos levantamentos de cargas.\n\nArquivo: {file_name}\n\nMensagem automática; não responda.",
        ));

        let email = Message::builder()
            .from(parse_mailbox(&self.from)?)
            .to(parse_mailbox(to)?)
            .subject("Exportação de levantamentos")
            .multipart(MultiPart::mixed().singlepart(body).singlepart(attachment))
            .map_err(email_err)?;

        self.smtp.send(&email).map_err(email_err)?;
        info!(
            "e-mail enviado para {to} ({file_name}, {} byte(s))",
            payload.len()
        );
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse::<Mailbox>()
        .map_err(|e| LevantamentoError::Email(format!("endereço '{address}' inválido: {e}")))
}

fn email_err(e: impl std::fmt::Display) -> LevantamentoError {
    LevantamentoError::Email(e.to_string())
}

/// Tipo MIME do anexo pela extensão do arquivo exportado.
fn attachment_content_type(file_name: &str) -> &'static str {
    if file_name.ends_with(".zip") {
        "application/zip"
    } else if file_name.ends_with(".xlsx") {
        XLSX_MIME
    } else {
        "application/octet-stream"
    }
}
