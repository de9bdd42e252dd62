use crate::chado::ChadoClient;
use crate::error::ReportError;
use crate::flatten::{FlatRecord, Flatten, flatten_registry};
use crate::registry::{Applied, Entity, EntityRegistry, Scalar};
use crate::reports::Report;

pub const ORGANISMS_QUERY: &str = "
    SELECT DISTINCT organism_id, abbreviation, genus, species, common_name
    FROM organism
    ORDER BY genus, species;";

pub const TAXON_ID_QUERY: &str = "
    SELECT DISTINCT o.organism_id, dbx.accession
    FROM organism o
    JOIN organism_dbxref odbx ON odbx.organism_id = o.organism_id
    JOIN dbxref dbx ON dbx.dbxref_id = odbx.dbxref_id
    JOIN db ON db.db_id = dbx.db_id
    WHERE odbx.is_current = true
      AND db.name = 'NCBITaxon';";

pub const DROSOPHILID_QUERY: &str = "
    SELECT DISTINCT o.organism_id
    FROM organism o
    JOIN organismprop op ON op.organism_id = o.organism_id
    JOIN cvterm cvt ON cvt.cvterm_id = op.type_id
    WHERE cvt.name = 'taxgroup'
      AND op.value = 'drosophilid';";

#[derive(Debug, Clone)]
pub struct OrganismRecord {
    pub abbreviation: String,
    pub genus: String,
    pub species: String,
    pub common_name: Scalar<String>,
    pub ncbi_taxon_id: Scalar<String>,
    pub drosophilid: bool,
}

impl Entity for OrganismRecord {
    fn public_id(&self) -> &str {
        &self.abbreviation
    }
}

impl Flatten for OrganismRecord {
    fn flatten(&self) -> FlatRecord {
        FlatRecord::builder()
            .text(self.genus.clone())
            .text(self.species.clone())
            .text(self.abbreviation.clone())
            .scalar(&self.common_name)
            .scalar(&self.ncbi_taxon_id)
            .flag(self.drosophilid, "y")
            .build()
    }
}

pub struct Organisms;

impl Organisms {
    pub fn collect(
        &self,
        chado: &mut dyn ChadoClient,
    ) -> Result<EntityRegistry<i64, OrganismRecord>, ReportError> {
        let rows = chado.query(ORGANISMS_QUERY)?;
        let mut organisms = EntityRegistry::from_rows(&rows, |row| {
            Ok(OrganismRecord {
                abbreviation: row.opt_text(1)?.unwrap_or_default().to_string(),
                genus: row.text(2)?.to_string(),
                species: row.text(3)?.to_string(),
                common_name: row.opt_text(4)?.map(str::to_string).into(),
                ncbi_taxon_id: Scalar::default(),
                drosophilid: false,
            })
        })?;

        organisms.enrich("NCBI taxon ids", &chado.query(TAXON_ID_QUERY)?, |organism, row| {
            Ok(organism.ncbi_taxon_id.set(row.text(1)?.to_string()))
        })?;
        organisms.enrich("drosophilids", &chado.query(DROSOPHILID_QUERY)?, |organism, _| {
            organism.drosophilid = true;
            Ok(Applied::Added)
        })?;
        Ok(organisms)
    }
}

impl Report for Organisms {
    fn label(&self) -> &'static str {
        "organism_list"
    }

    fn title(&self) -> &'static str {
        "FlyBase organisms report"
    }

    fn columns(&self) -> &'static [&'static str] {
        &[
            "genus",
            "species",
            "abbreviation",
            "common_name",
            "NCBI_taxon_ID",
            "drosophilid?",
        ]
    }

    fn sort_columns(&self) -> &'static [usize] {
        &[0, 1, 2]
    }

    fn build(&self, chado: &mut dyn ChadoClient) -> Result<Vec<FlatRecord>, ReportError> {
        let organisms = self.collect(chado)?;
        Ok(flatten_registry(&organisms))
    }
}
