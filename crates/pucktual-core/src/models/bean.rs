use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bean {
    pub id: i64,
    pub name: String,
    pub manufacturer: String,
    #[serde(default)]
    pub decaf: bool,
}

impl Bean {
    /// Name with a decaf marker, as shown in the bean list
    pub fn display_name(&self) -> String {
        if self.decaf {
            format!("{} (decaf)", self.name)
        } else {
            self.name.clone()
        }
    }
}
