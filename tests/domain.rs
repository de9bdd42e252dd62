use assert_matches::assert_matches;

use flybase_bulk_reports::domain::{FlyBaseId, InvalidFlyBaseId};
use flybase_bulk_reports::text::{Encoding, clean_free_text, convert};

#[test]
fn parse_flybase_ids() {
    let gene: FlyBaseId = "FBgn0000490".parse().unwrap();
    assert_eq!(gene.kind(), "gn");

    let tool: FlyBaseId = "FBto0000001".parse().unwrap();
    assert_eq!(tool.as_str(), "FBto0000001");

    let long: FlyBaseId = "FBrf0212345678".parse().unwrap();
    assert_eq!(long.kind(), "rf");
}

#[test]
fn parse_flybase_id_invalid() {
    let err = "FB:".parse::<FlyBaseId>().unwrap_err();
    assert_matches!(err, InvalidFlyBaseId(_));
    assert_eq!(err.to_string(), "invalid FlyBase id: FB:");
}

#[test]
fn every_encoding_round_trips_through_html() {
    let sgml = "&Dgr;&agr;<up>ts1</up> P<down>ch</down>";
    for encoding in [Encoding::Proforma, Encoding::ChadoSgml, Encoding::Html] {
        let encoded = convert(sgml, Encoding::ChadoSgml, encoding);
        assert_eq!(convert(&encoded, encoding, Encoding::ChadoSgml), sgml, "{encoding}");
    }
    assert_eq!(
        convert(sgml, Encoding::ChadoSgml, Encoding::Plain),
        "Deltaalpha[ts1] P[[ch]]"
    );
}

#[test]
fn free_text_cleanup_is_idempotent() {
    let once = clean_free_text("Loss of\tfunction.\n\nSee also  FBal0000001.");
    assert_eq!(once, "Loss of function. See also FBal0000001.");
    assert_eq!(clean_free_text(&once), once);
}
