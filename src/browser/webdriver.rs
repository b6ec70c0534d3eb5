use crate::browser::{Browser, BrowserError, Locator, Surface};
use crate::config::BrowserConfig;
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use tracing::debug;
use url::Url;

const CLICK_WITHIN: &str = r#"
const [scopeCss, scopeIndex, targetCss, targetIndex] = arguments;
const scopes = document.querySelectorAll(scopeCss);
if (scopes.length <= scopeIndex) { return false; }
const targets = scopes[scopeIndex].querySelectorAll(targetCss);
if (targets.length <= targetIndex) { return false; }
targets[targetIndex].click();
return true;
"#;

// ── Session factory ───────────────────────────────────────────────────────────

/// Opens headless Chrome sessions against a chromedriver endpoint.
pub struct WebdriverBrowser {
    config: BrowserConfig,
}

impl WebdriverBrowser {
    pub fn new(config: &BrowserConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Hit the WebDriver /status endpoint before opening any session, so a
    /// missing chromedriver fails fast with a readable error instead of a
    /// connect timeout mid-crawl.
    pub async fn probe(&self) -> Result<(), BrowserError> {
        let url = Url::parse(&self.config.webdriver_url)
            .and_then(|base| base.join("/status"))
            .map_err(|e| BrowserError::Probe(format!("bad webdriver url: {e}")))?;
        let resp = reqwest::get(url.as_str())
            .await
            .map_err(|e| BrowserError::Probe(e.to_string()))?;
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| BrowserError::Probe(e.to_string()))?;

        if body["value"]["ready"].as_bool().unwrap_or(false) {
            Ok(())
        } else {
            Err(BrowserError::Probe(format!(
                "endpoint {} is up but reports not ready",
                url
            )))
        }
    }

    fn capabilities(&self) -> fantoccini::wd::Capabilities {
        let mut args = vec![
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-gpu".to_string(),
            format!("--window-size={}", self.config.window_size),
            format!("--user-agent={}", self.config.user_agent),
        ];
        if self.config.headless {
            args.push("--headless=new".to_string());
        }

        let mut caps = serde_json::Map::new();
        caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
        caps.insert(
            "timeouts".to_string(),
            json!({ "pageLoad": self.config.page_load_timeout_secs * 1000 }),
        );
        caps
    }
}

#[async_trait]
impl Browser for WebdriverBrowser {
    async fn open(&self) -> Result<Box<dyn Surface>, BrowserError> {
        debug!("Opening webdriver session at {}", self.config.webdriver_url);
        let client = ClientBuilder::native()
            .capabilities(self.capabilities())
            .connect(&self.config.webdriver_url)
            .await
            .map_err(|e| BrowserError::Session(e.to_string()))?;
        Ok(Box::new(WebdriverSurface {
            client: Some(client),
        }))
    }
}

// ── Surface ───────────────────────────────────────────────────────────────────

/// `close` consumes the fantoccini handle, hence the Option.
pub struct WebdriverSurface {
    client: Option<Client>,
}

impl WebdriverSurface {
    fn client(&self) -> Result<&Client, BrowserError> {
        self.client.as_ref().ok_or(BrowserError::Closed)
    }

    async fn run_script(&self, script: &str) -> Result<(), BrowserError> {
        self.client()?
            .execute(script, vec![])
            .await
            .map_err(|e| BrowserError::Command(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl Surface for WebdriverSurface {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError> {
        self.client()?
            .goto(url)
            .await
            .map_err(|e| BrowserError::Command(e.to_string()))
    }

    async fn source(&mut self) -> Result<String, BrowserError> {
        self.client()?
            .source()
            .await
            .map_err(|e| BrowserError::Command(e.to_string()))
    }

    async fn click_within(
        &mut self,
        scope: &Locator,
        target: &Locator,
    ) -> Result<bool, BrowserError> {
        let args = vec![
            json!(scope.css),
            json!(scope.index),
            json!(target.css),
            json!(target.index),
        ];
        let clicked = self
            .client()?
            .execute(CLICK_WITHIN, args)
            .await
            .map_err(|e| BrowserError::Command(e.to_string()))?;
        Ok(clicked.as_bool().unwrap_or(false))
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), BrowserError> {
        self.run_script("window.scrollTo(0, document.body.scrollHeight);")
            .await
    }

    async fn scroll_to_top(&mut self) -> Result<(), BrowserError> {
        self.run_script("window.scrollTo(0, 0);").await
    }

    async fn reset(&mut self) -> Result<(), BrowserError> {
        self.client()?
            .delete_all_cookies()
            .await
            .map_err(|e| BrowserError::Command(e.to_string()))?;
        // storage can be unavailable on the initial blank page; not worth
        // discarding the session over
        let _ = self
            .run_script("window.localStorage.clear(); window.sessionStorage.clear();")
            .await;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if let Some(client) = self.client.take() {
            client
                .close()
                .await
                .map_err(|e| BrowserError::Command(e.to_string()))?;
        }
        Ok(())
    }
}
