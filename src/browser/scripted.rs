//! Scripted in-memory surfaces for crawler tests.
//!
//! A route maps a URL to the ordered sequence of page states the document
//! passes through. A successful pagination click schedules the next state,
//! which becomes visible after `click_lag` further `source()` calls. That
//! models the real site, where the table re-renders a beat after the click
//! and a snapshot taken too early still shows the old page.

use crate::browser::{Browser, BrowserError, Locator, Surface};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub struct ScriptedBrowser {
    routes: Arc<HashMap<String, Vec<String>>>,
    log: Arc<Mutex<Vec<String>>>,
    click_lag: usize,
}

impl ScriptedBrowser {
    pub fn new(routes: HashMap<String, Vec<String>>) -> Self {
        Self {
            routes: Arc::new(routes),
            log: Arc::new(Mutex::new(Vec::new())),
            click_lag: 1,
        }
    }

    /// Number of `source()` calls a click needs before the new state shows.
    pub fn with_click_lag(mut self, lag: usize) -> Self {
        self.click_lag = lag.max(1);
        self
    }

    pub fn clicks(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl Browser for ScriptedBrowser {
    async fn open(&self) -> Result<Box<dyn Surface>, BrowserError> {
        Ok(Box::new(ScriptedSurface {
            routes: Arc::clone(&self.routes),
            log: Arc::clone(&self.log),
            click_lag: self.click_lag,
            current: None,
            state: 0,
            pending: None,
        }))
    }
}

pub struct ScriptedSurface {
    routes: Arc<HashMap<String, Vec<String>>>,
    log: Arc<Mutex<Vec<String>>>,
    click_lag: usize,
    current: Option<String>,
    state: usize,
    // (source calls until visible, state index to switch to)
    pending: Option<(usize, usize)>,
}

impl ScriptedSurface {
    fn pages(&self) -> Result<&Vec<String>, BrowserError> {
        let url = self
            .current
            .as_ref()
            .ok_or_else(|| BrowserError::Command("no page loaded".into()))?;
        self.routes
            .get(url)
            .ok_or_else(|| BrowserError::Command(format!("no scripted route for {}", url)))
    }

    fn upcoming_state(&self) -> usize {
        self.pending.map(|(_, next)| next).unwrap_or(self.state)
    }
}

#[async_trait]
impl Surface for ScriptedSurface {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError> {
        if !self.routes.contains_key(url) {
            return Err(BrowserError::Command(format!(
                "no scripted route for {}",
                url
            )));
        }
        self.current = Some(url.to_string());
        self.state = 0;
        self.pending = None;
        Ok(())
    }

    async fn source(&mut self) -> Result<String, BrowserError> {
        if let Some((remaining, next)) = self.pending {
            if remaining <= 1 {
                self.state = next;
                self.pending = None;
            } else {
                self.pending = Some((remaining - 1, next));
            }
        }
        let pages = self.pages()?;
        Ok(pages[self.state.min(pages.len() - 1)].clone())
    }

    async fn click_within(
        &mut self,
        scope: &Locator,
        target: &Locator,
    ) -> Result<bool, BrowserError> {
        self.log.lock().unwrap().push(format!(
            "{}@{} -> {}@{}",
            scope.css, scope.index, target.css, target.index
        ));

        // The next arrow only reveals more page numbers in the live pager;
        // it never changes which page is shown.
        if target.css.contains("ant-pagination-next") {
            return Ok(true);
        }

        let next = self.upcoming_state() + 1;
        if next < self.pages()?.len() {
            self.pending = Some((self.click_lag, next));
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn scroll_to_top(&mut self) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn reset(&mut self) -> Result<(), BrowserError> {
        self.current = None;
        self.state = 0;
        self.pending = None;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        Ok(())
    }
}
