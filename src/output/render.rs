use comfy_table::Table;

/// Where command output goes.
pub trait Render: Send + Sync {
    fn line(&self, text: &str);

    fn table(&self, table: &Table);

    fn blank(&self) {
        self.line("");
    }
}

/// Standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct Terminal;

impl Render for Terminal {
    fn line(&self, text: &str) {
        println!("{text}");
    }

    fn table(&self, table: &Table) {
        println!("{table}");
    }
}

#[cfg(test)]
pub(crate) use capture::Capture;
